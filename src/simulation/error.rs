//! Error types for frame parsing.

use thiserror::Error;

/// Errors that can occur when reading a simulation frame or bridge message.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown light state {0:?}")]
    UnknownLightState(String),

    #[error("unknown vehicle status {0:?}")]
    UnknownStatus(String),

    #[error("invalid frame: {0}")]
    Invalid(String),
}

/// Alias for `Result<T, FrameError>`.
pub type FrameResult<T> = Result<T, FrameError>;
