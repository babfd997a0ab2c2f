//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The store could not be reached
    #[error("Network unreachable: {0}")]
    Unreachable(String),

    /// The auth token was missing, malformed, expired or did not verify
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Publish rejected: {0}")]
    Rejected(String),

    #[error("Subscription closed")]
    Closed,
}
