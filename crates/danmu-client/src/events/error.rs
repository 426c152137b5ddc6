//! Event parsing errors

use thiserror::Error;

/// A notification body that does not have the expected shape
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Protocol(#[from] crate::protocol::ProtocolError),
}

pub type EventResult<T> = Result<T, EventError>;
