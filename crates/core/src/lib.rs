//! # syntgen core
//!
//! Synthetic HealthLink HL7 v2 message generation.
//!
//! Given a message type id (1..=31) this crate assembles a structurally valid HL7 v2 message
//! populated with realistic Irish healthcare data and renders it in one of three encodings:
//! - the pipe-delimited linear form ([`LinearEncoder`]),
//! - nested tagged elements ([`NestedEncoder`]),
//! - a JSON record wrapping the nested form with type metadata ([`EnvelopeEncoder`]).
//!
//! Free-text fields can optionally be rewritten by an [`EnhancementHook`]; any hook failure
//! falls back to the provider's own text.
//!
//! **No transport concerns**: HTTP serving and command-line parsing live in `api-rest` and
//! `cli`. The Azure OpenAI hook lives in `syntgen-enhance`.

pub mod builder;
pub mod config;
pub mod constants;
pub mod encode;
pub mod enhance;
pub mod error;
pub mod framing;
pub mod model;
pub mod provider;
pub mod registry;
pub mod service;
pub mod validation;

pub use builder::{BuildOptions, MessageBuilder};
pub use config::CoreConfig;
pub use encode::{EnvelopeEncoder, LinearEncoder, NestedEncoder, StructuredRecord};
pub use enhance::{
    EnhanceableField, EnhancementHook, EnhancementRequest, EnhancementUnavailable, Enhancer,
};
pub use error::{GenerationError, GenerationResult};
pub use framing::{FramedMessage, FramingInfo};
pub use model::Message;
pub use provider::{DemographicConstraints, IrishValueProvider, Sex, ValueKind, ValueProvider};
pub use registry::{GrammarFamily, MessageTypeDefinition};
pub use service::{
    GenerationOutput, GenerationRequest, Generated, GeneratorService, OutputFormat,
};
