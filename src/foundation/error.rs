pub type ReelResult<T> = Result<T, ReelError>;

/// Errors surfaced by reel assembly and rendering.
///
/// Synthesizer failures are carried by [`ReelError::Other`] untouched, so callers can
/// `downcast_ref` to the error type their synthesizer produced.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for invalid-argument failures raised before any work starts.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
