//! Content codecs

use super::{ContentError, ContentTypeId, EncodedContent};

/// Converts a content value to and from [`EncodedContent`]
pub trait ContentCodec: Send + Sync {
    type Content;
    type Error: std::error::Error + Send + Sync + 'static;

    fn content_type(&self) -> ContentTypeId;

    fn encode(&self, content: &Self::Content) -> Result<EncodedContent, Self::Error>;

    fn decode(&self, content: &EncodedContent) -> Result<Self::Content, Self::Error>;

    /// Text shown by clients that cannot decode this type
    fn fallback(&self, _content: &Self::Content) -> Option<String> {
        None
    }
}

/// UTF-8 text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl TextCodec {
    pub fn content_type_id() -> ContentTypeId {
        ContentTypeId::new("courier.org", "text", 1, 0)
    }
}

impl ContentCodec for TextCodec {
    type Content = String;
    type Error = ContentError;

    fn content_type(&self) -> ContentTypeId {
        Self::content_type_id()
    }

    fn encode(&self, content: &String) -> Result<EncodedContent, ContentError> {
        Ok(EncodedContent::new(self.content_type(), content.as_bytes().to_vec())
            .with_parameter("encoding", "UTF-8"))
    }

    fn decode(&self, content: &EncodedContent) -> Result<String, ContentError> {
        content.expect_type(&self.content_type())?;
        match content.parameters.get("encoding").map(String::as_str) {
            None | Some("UTF-8") => {}
            Some(other) => {
                return Err(ContentError::InvalidContent(format!(
                    "unrecognized encoding {}",
                    other
                )))
            }
        }
        String::from_utf8(content.content.clone())
            .map_err(|e| ContentError::InvalidContent(e.to_string()))
    }
}
