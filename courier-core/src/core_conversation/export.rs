//! JSON export shapes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConversationV2Export {
    /// Written on export, ignored on import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub topic: String,
    /// Base64 (standard alphabet)
    pub key_material: String,
    pub peer_address: String,
    #[serde(default)]
    pub context: Option<ContextExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContextExport {
    pub conversation_id: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Legacy schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConversationV1Export {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub peer_address: String,
    /// RFC 3339 with fractional seconds
    pub created_at: String,
}
