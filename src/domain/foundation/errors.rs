//! Error types for the domain layer.

use thiserror::Error;

/// Errors raised while decoding an inbound notification payload.
///
/// These never leave the event router; they are counted and logged.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Payload is empty")]
    Empty,

    #[error("Payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}
