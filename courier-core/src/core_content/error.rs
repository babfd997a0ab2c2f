//! Content error types

use thiserror::Error;

use crate::core_crypto::CryptoError;

/// Errors from the plain content codecs
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Content type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for ContentError {
    fn from(e: bincode::Error) -> Self {
        ContentError::Serialization(e.to_string())
    }
}

/// Errors from encrypting, referencing and fetching remote attachments
///
/// Decoding failures stay distinct so callers can tell a bad reference
/// (abandon) from a failed fetch (maybe retry).
#[derive(Debug, Error)]
pub enum RemoteAttachmentError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    #[error("Invalid scheme: {0}")]
    InvalidScheme(String),

    #[error("No payload at remote URL")]
    PayloadNotFound,

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Encode error: {0}")]
    Encode(String),

    /// The decrypted bytes did not decode
    #[error("Decode error: {0}")]
    Decode(String),
}
