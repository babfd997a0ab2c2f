//! Reactions to earlier messages

use serde::{Deserialize, Serialize};

use super::{ContentCodec, ContentError, ContentTypeId, EncodedContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionSchema {
    Unicode,
    Shortcode,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Id of the message reacted to
    pub reference: String,
    pub action: ReactionAction,
    pub content: String,
    pub schema: ReactionSchema,
}

/// JSON-encoded reactions
#[derive(Debug, Clone, Copy, Default)]
pub struct ReactionCodec;

impl ReactionCodec {
    pub fn content_type_id() -> ContentTypeId {
        ContentTypeId::new("courier.org", "reaction", 1, 0)
    }
}

impl ContentCodec for ReactionCodec {
    type Content = Reaction;
    type Error = ContentError;

    fn content_type(&self) -> ContentTypeId {
        Self::content_type_id()
    }

    fn encode(&self, content: &Reaction) -> Result<EncodedContent, ContentError> {
        let body =
            serde_json::to_vec(content).map_err(|e| ContentError::Serialization(e.to_string()))?;
        Ok(EncodedContent::new(self.content_type(), body).with_fallback(self.fallback(content)))
    }

    fn decode(&self, content: &EncodedContent) -> Result<Reaction, ContentError> {
        content.expect_type(&self.content_type())?;
        serde_json::from_slice(&content.content)
            .map_err(|e| ContentError::InvalidContent(e.to_string()))
    }

    fn fallback(&self, content: &Reaction) -> Option<String> {
        Some(match content.action {
            ReactionAction::Added => format!("Reacted \"{}\" to an earlier message", content.content),
            ReactionAction::Removed => {
                format!("Removed \"{}\" from an earlier message", content.content)
            }
        })
    }
}
