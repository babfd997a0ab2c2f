//! Identity error types

use thiserror::Error;

use super::wallet::SignerError;
use crate::core_crypto::CryptoError;
use crate::core_transport::TransportError;

/// Result type for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Key bundle has no pre-key")]
    MissingPreKey,
}

impl From<bincode::Error> for IdentityError {
    fn from(e: bincode::Error) -> Self {
        IdentityError::Serialization(e.to_string())
    }
}
