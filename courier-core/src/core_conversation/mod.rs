//! Conversation export and import

mod conversation;
mod error;
mod export;
mod importer;

pub use conversation::{Conversation, ConversationV1, ConversationV2, InvitationContext};
pub use error::ConversationImportError;
pub use importer::ConversationImporter;
