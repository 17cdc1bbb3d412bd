//! Relay error types.

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;

/// Relay error type.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Socket or stdio failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket transport failure.
    #[error("WebSocket error: {0}")]
    Transport(String),
}

impl From<axum::Error> for RelayError {
    fn from(e: axum::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}

/// Failure to hand a value list to an outlet.
#[derive(Debug, Error)]
pub enum OutletError {
    /// Bounded channel is full; the values were dropped.
    #[error("Outlet channel full")]
    ChannelFull,

    /// Receiving side of the channel is gone.
    #[error("Outlet channel closed")]
    ChannelClosed,

    /// Socket or stdout write failed.
    #[error("Outlet IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Values could not be encoded for the sink.
    #[error("Outlet encode error: {0}")]
    Encode(String),
}

impl<T> From<TrySendError<T>> for OutletError {
    fn from(e: TrySendError<T>) -> Self {
        match e {
            TrySendError::Full(_) => OutletError::ChannelFull,
            TrySendError::Closed(_) => OutletError::ChannelClosed,
        }
    }
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
