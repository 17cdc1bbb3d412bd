//! Decoder error types.

use thiserror::Error;

/// Why a raw message produced no records.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Valid JSON, but not the shape the configured convention expects.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl DecodeError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::MalformedPayload(_) => "malformed",
            DecodeError::ShapeMismatch(_) => "shape_mismatch",
        }
    }

    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        DecodeError::ShapeMismatch(reason.into())
    }
}

/// Result type for decoder operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
