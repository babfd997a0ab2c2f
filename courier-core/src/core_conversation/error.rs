use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversationImportError {
    /// The bytes match no known export schema
    #[error("Invalid conversation data: {0}")]
    InvalidData(String),
}
