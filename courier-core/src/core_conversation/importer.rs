//! Conversation import
//!
//! Exports come in two shapes. Matchers are tried in order and the first
//! match wins. The legacy matcher refuses anything carrying current-schema
//! fields, so no document matches both.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::export::{ConversationV1Export, ConversationV2Export};
use super::{
    Conversation, ConversationImportError, ConversationV1, ConversationV2, InvitationContext,
};

type Matcher = fn(&Value) -> Result<Conversation, String>;

pub struct ConversationImporter {
    matchers: Vec<(&'static str, Matcher)>,
}

impl ConversationImporter {
    pub fn new() -> Self {
        Self {
            matchers: vec![("current", match_current), ("legacy", match_legacy)],
        }
    }

    pub fn import(&self, bytes: &[u8]) -> Result<Conversation, ConversationImportError> {
        let document: Value = serde_json::from_slice(bytes)
            .map_err(|e| ConversationImportError::InvalidData(format!("not JSON: {}", e)))?;

        let mut rejections = Vec::with_capacity(self.matchers.len());
        for (name, matcher) in &self.matchers {
            match matcher(&document) {
                Ok(conversation) => {
                    debug!(schema = *name, peer = conversation.peer_address(), "Imported conversation");
                    return Ok(conversation);
                }
                Err(reason) => rejections.push(format!("{}: {}", name, reason)),
            }
        }

        Err(ConversationImportError::InvalidData(rejections.join("; ")))
    }
}

impl Default for ConversationImporter {
    fn default() -> Self {
        Self::new()
    }
}

fn match_current(document: &Value) -> Result<Conversation, String> {
    let export: ConversationV2Export =
        serde_json::from_value(document.clone()).map_err(|e| e.to_string())?;
    let key_material = STANDARD
        .decode(&export.key_material)
        .map_err(|e| format!("keyMaterial: {}", e))?;
    let context = export
        .context
        .map(|c| InvitationContext {
            conversation_id: c.conversation_id,
            metadata: c.metadata,
        })
        .unwrap_or_default();

    Ok(Conversation::V2(ConversationV2 {
        topic: export.topic,
        key_material,
        context,
        peer_address: export.peer_address,
    }))
}

fn match_legacy(document: &Value) -> Result<Conversation, String> {
    if let Some(field) = ["topic", "keyMaterial"]
        .iter()
        .find(|field| document.get(**field).is_some())
    {
        return Err(format!("unexpected field {}", field));
    }

    let export: ConversationV1Export =
        serde_json::from_value(document.clone()).map_err(|e| e.to_string())?;
    let created_at = parse_created_at(&export.created_at)?;

    Ok(Conversation::V1(ConversationV1::new(export.peer_address, created_at)))
}

/// RFC 3339 timestamps that carry fractional seconds
fn parse_created_at(raw: &str) -> Result<DateTime<Utc>, String> {
    let has_fraction = raw
        .split_once('T')
        .map(|(_, time)| time.contains('.'))
        .unwrap_or(false);
    if !has_fraction {
        return Err(format!("createdAt {:?} lacks fractional seconds", raw));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("createdAt: {}", e))
}
