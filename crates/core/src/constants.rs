//! Constants used throughout the syntgen core crate.
//!
//! Delimiters, header defaults and framing bytes live here so the builder and every encoder
//! agree on them.

/// Field separator (MSH.1).
pub const FIELD_SEPARATOR: char = '|';

/// Component separator.
pub const COMPONENT_SEPARATOR: char = '^';

/// Repetition separator.
pub const REPETITION_SEPARATOR: char = '~';

/// Escape character.
pub const ESCAPE_CHARACTER: char = '\\';

/// Sub-component separator.
pub const SUBCOMPONENT_SEPARATOR: char = '&';

/// Encoding characters as declared in MSH.2.
pub const ENCODING_CHARACTERS: &str = "^~\\&";

/// Segment terminator for the linear encoding.
pub const SEGMENT_TERMINATOR: char = '\r';

/// Tag of the header segment.
pub const HEADER_TAG: &str = "MSH";

/// Highest header field position written by the builder.
pub const HEADER_MAX_POSITION: usize = 12;

/// Default prefix for MSH.3; the message type id is appended.
pub const DEFAULT_SENDING_APPLICATION_PREFIX: &str = "HL7SYNTGEN";

/// Default MSH.5.
pub const DEFAULT_RECEIVING_APPLICATION: &str = "HEALTHLINK";

/// Default MSH.6.
pub const DEFAULT_RECEIVING_FACILITY: &str = "HSE";

/// Default MSH.12.
pub const DEFAULT_HL7_VERSION: &str = "2.5";

/// MSH.11 processing id for production traffic.
pub const PROCESSING_ID_PRODUCTION: &str = "P";

/// Default enhancement budget in milliseconds.
pub const DEFAULT_ENHANCEMENT_TIMEOUT_MS: u64 = 8_000;

/// Lowest valid message type id.
pub const MIN_MESSAGE_TYPE_ID: u32 = 1;

/// Highest valid message type id.
pub const MAX_MESSAGE_TYPE_ID: u32 = 31;

/// MLLP start-of-block byte (VT).
pub const MLLP_START_BLOCK: u8 = 0x0B;

/// MLLP end-of-block byte (FS).
pub const MLLP_END_BLOCK: u8 = 0x1C;

/// MLLP trailing carriage return.
pub const MLLP_TERMINATOR: u8 = 0x0D;
