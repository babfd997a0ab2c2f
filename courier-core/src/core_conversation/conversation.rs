//! Conversation descriptors

use chrono::{DateTime, SubsecRound, Utc};
use std::collections::BTreeMap;

use super::export::{ContextExport, ConversationV1Export, ConversationV2Export};

/// Conversation from before topics were negotiated: identified by peer and start time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationV1 {
    pub peer_address: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationV1 {
    /// `created_at` keeps millisecond precision, as exports do
    pub fn new(peer_address: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            peer_address: peer_address.into(),
            created_at: created_at.trunc_subsecs(3),
        }
    }
}

/// Application-defined context carried by an invitation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvitationContext {
    pub conversation_id: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ConversationV2 {
    pub topic: String,
    pub key_material: Vec<u8>,
    pub context: InvitationContext,
    pub peer_address: String,
}

impl std::fmt::Debug for ConversationV2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationV2")
            .field("topic", &self.topic)
            .field("key_material", &"[REDACTED]")
            .field("context", &self.context)
            .field("peer_address", &self.peer_address)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    V1(ConversationV1),
    V2(ConversationV2),
}

impl Conversation {
    pub fn peer_address(&self) -> &str {
        match self {
            Conversation::V1(c) => &c.peer_address,
            Conversation::V2(c) => &c.peer_address,
        }
    }

    /// Negotiated topic; legacy conversations have none
    pub fn topic(&self) -> Option<&str> {
        match self {
            Conversation::V1(_) => None,
            Conversation::V2(c) => Some(&c.topic),
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            Conversation::V1(_) => "v1",
            Conversation::V2(_) => "v2",
        }
    }

    /// JSON export that [`ConversationImporter`](super::ConversationImporter) reads back
    pub fn export(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Conversation::V1(c) => serde_json::to_vec(&ConversationV1Export::from(c)),
            Conversation::V2(c) => serde_json::to_vec(&ConversationV2Export::from(c)),
        }
    }
}

impl From<&ConversationV1> for ConversationV1Export {
    fn from(c: &ConversationV1) -> Self {
        Self {
            version: Some("v1".to_string()),
            peer_address: c.peer_address.clone(),
            created_at: c
                .created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

impl From<&ConversationV2> for ConversationV2Export {
    fn from(c: &ConversationV2) -> Self {
        use base64::Engine;

        Self {
            version: Some("v2".to_string()),
            topic: c.topic.clone(),
            key_material: base64::engine::general_purpose::STANDARD.encode(&c.key_material),
            peer_address: c.peer_address.clone(),
            context: Some(ContextExport {
                conversation_id: c.context.conversation_id.clone(),
                metadata: c.context.metadata.clone(),
            }),
        }
    }
}
