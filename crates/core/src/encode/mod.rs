//! Wire encodings derived from the canonical [`Message`](crate::model::Message) tree.
//!
//! Each encoder is a pure function of the message: encoding the same message twice gives
//! byte-identical output.

mod envelope;
mod linear;
mod nested;

pub use envelope::{EnvelopeEncoder, StructuredRecord};
pub use linear::LinearEncoder;
pub use nested::NestedEncoder;
