//! Encoded content

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::ContentError;

/// `authority/type:major.minor`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentTypeId {
    pub authority_id: String,
    pub type_id: String,
    pub version_major: u32,
    pub version_minor: u32,
}

impl ContentTypeId {
    pub fn new(authority_id: &str, type_id: &str, version_major: u32, version_minor: u32) -> Self {
        Self {
            authority_id: authority_id.to_string(),
            type_id: type_id.to_string(),
            version_major,
            version_minor,
        }
    }

    /// Same authority and type, ignoring version
    pub fn same_type(&self, other: &ContentTypeId) -> bool {
        self.authority_id == other.authority_id && self.type_id == other.type_id
    }
}

impl fmt::Display for ContentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}.{}",
            self.authority_id, self.type_id, self.version_major, self.version_minor
        )
    }
}

/// Content as carried inside a message, before any encryption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedContent {
    pub content_type: ContentTypeId,
    pub parameters: BTreeMap<String, String>,
    /// Human-readable alternative for clients without the codec
    pub fallback: Option<String>,
    pub content: Vec<u8>,
}

impl EncodedContent {
    pub fn new(content_type: ContentTypeId, content: Vec<u8>) -> Self {
        Self {
            content_type,
            parameters: BTreeMap::new(),
            fallback: None,
            content,
        }
    }

    pub fn with_parameter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn with_fallback(mut self, fallback: Option<String>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ContentError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContentError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Fail unless this content was produced for `expected`
    pub fn expect_type(&self, expected: &ContentTypeId) -> Result<(), ContentError> {
        if self.content_type.same_type(expected) {
            Ok(())
        } else {
            Err(ContentError::TypeMismatch {
                expected: expected.to_string(),
                actual: self.content_type.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_display() {
        let id = ContentTypeId::new("courier.org", "text", 1, 0);
        assert_eq!(id.to_string(), "courier.org/text:1.0");
    }

    #[test]
    fn test_type_check_ignores_version() {
        let v1 = ContentTypeId::new("courier.org", "text", 1, 0);
        let v2 = ContentTypeId::new("courier.org", "text", 2, 1);
        let other = ContentTypeId::new("courier.org", "reaction", 1, 0);

        let content = EncodedContent::new(v2, vec![]);
        assert!(content.expect_type(&v1).is_ok());
        assert!(matches!(
            content.expect_type(&other),
            Err(ContentError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(EncodedContent::from_bytes(&[0xff; 3]).is_err());
    }
}
