//! Error types for the API client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the job-dispatch API
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials were rejected even after a token refresh
    #[error("credentials rejected by the job API")]
    AuthFailure,

    /// Network failure, throttling, or a 5xx from the API
    #[error("transient API failure: {0}")]
    Transient(String),

    /// The API rejected the request with a non-auth 4xx
    #[error("request rejected (status {status}): {message}")]
    BadRequest { status: u16, message: String },

    /// The API replied with a body the client could not interpret
    #[error("malformed API response: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Check if retrying later could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Check if this is a credential rejection
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailure)
    }
}
