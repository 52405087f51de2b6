//! Error types for the Beacon protocol

use thiserror::Error;

/// Protocol-level errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::MalformedFrame(e.to_string())
    }
}

/// Session-code allocation errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeError {
    #[error("session code space exhausted after {0} attempts")]
    SpaceExhausted(u32),

    #[error("system entropy source unavailable")]
    RngFailure,
}
