//! Room discovery error types

use thiserror::Error;

/// Error returned by [`RoomApi`](crate::RoomApi) implementations
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level HTTP failure (DNS, TLS, timeout, non-JSON body)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-zero status code
    #[error("API returned code {code}: {message}")]
    Status { code: i64, message: String },

    /// The response was well-formed JSON but missing what we need
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The cookie does not belong to a logged-in account
    #[error("Not logged in")]
    NotLoggedIn,
}

impl ApiError {
    /// Whether the failure came from the remote answering with an error code
    #[must_use]
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

/// Result type for room discovery operations
pub type ApiResult<T> = Result<T, ApiError>;
