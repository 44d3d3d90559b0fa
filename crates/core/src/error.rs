/// Errors returned while building or encoding a message.
///
/// `UnknownType` is the caller's fault. `Encoding` and `Grammar` point at a bug in a value
/// provider or in the grammar tables and are reported as server errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("unknown message type id {0}: must be between 1 and 31")]
    UnknownType(u32),
    #[error("encoding error: {0}")]
    Encoding(String),
    #[error("grammar error: {0}")]
    Grammar(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GenerationError {
    /// True when the error was caused by the request rather than by the generator.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownType(_) | Self::InvalidInput(_))
    }
}

impl From<quick_xml::Error> for GenerationError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Encoding(format!("failed to write nested element: {err}"))
    }
}

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;
