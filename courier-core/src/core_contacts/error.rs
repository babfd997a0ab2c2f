use thiserror::Error;

use crate::core_identity::IdentityError;
use crate::core_transport::TransportError;

pub type ContactResult<T> = Result<T, ContactError>;

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid contact record: {0}")]
    InvalidRecord(String),
}

impl From<bincode::Error> for ContactError {
    fn from(e: bincode::Error) -> Self {
        ContactError::InvalidRecord(e.to_string())
    }
}
