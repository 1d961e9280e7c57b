//! Error types for LoopTrack

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum LtError {
    #[error("Unknown state key: {0}")]
    UnknownStateKey(String),

    #[error("Invalid payload for '{key}': {reason}")]
    InvalidPayload { key: String, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type LtResult<T> = Result<T, LtError>;
