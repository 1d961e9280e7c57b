//! Bridge error types

use lt_core::LtError;
use thiserror::Error;

/// Errors raised between the timeline and the engine
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Engine unavailable")]
    EngineUnavailable,

    #[error("Reply channel closed before '{0}' answered")]
    ChannelClosed(&'static str),

    #[error("Engine rejected '{command}': {reason}")]
    Rejected {
        command: &'static str,
        reason: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unexpected reply to '{command}'")]
    UnexpectedReply { command: &'static str },

    #[error("Decode error: {0}")]
    Decode(#[from] LtError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
