//! Session and transport errors

use crate::protocol::ProtocolError;
use thiserror::Error;

/// Socket level failure. Always recoverable by reconnecting.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The peer closed the stream or sent a close frame
    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Lifecycle failure surfaced by [`Session`](super::Session)
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad caller input; retrying will not help
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No usable room id could be resolved
    #[error("Discovery failed: {0}")]
    Discovery(#[from] danmu_api::ApiError),

    /// Every allowed connect attempt failed
    #[error("Failed to connect to {host} after {attempts} attempts: {source}")]
    Connect {
        host: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The enter frame could not be built
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Session already started")]
    AlreadyStarted,

    /// `stop` was called, or the session is closed
    #[error("Session stopped")]
    Stopped,
}

impl SessionError {
    /// Whether calling `start` again could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Discovery(_) | Self::Connect { .. })
    }
}

/// Session result type
pub type SessionResult<T> = Result<T, SessionError>;
