//! Error types for the client layer

use thiserror::Error;

use crate::config::ConfigError;
use crate::core_contacts::ContactError;
use crate::core_conversation::ConversationImportError;
use crate::core_identity::IdentityError;
use crate::core_transport::TransportError;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Bootstrap failed; no partially initialized client exists
    #[error("Client creation failed: {0}")]
    Creation(String),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Contact error: {0}")]
    Contact(#[from] ContactError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Import error: {0}")]
    Import(#[from] ConversationImportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
