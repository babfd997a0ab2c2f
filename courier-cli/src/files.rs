//! Local file support for the attachment commands

use async_trait::async_trait;
use courier_core::core_content::{
    ContentCodec, ContentError, ContentTypeId, EncodedContent, RemoteAttachmentError,
    RemoteContentFetcher,
};
use std::path::PathBuf;

/// A file carried as attachment content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Raw bytes plus their filename
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCodec;

impl FileCodec {
    pub fn content_type_id() -> ContentTypeId {
        ContentTypeId::new("courier.org", "attachment", 1, 0)
    }
}

impl ContentCodec for FileCodec {
    type Content = FileAttachment;
    type Error = ContentError;

    fn content_type(&self) -> ContentTypeId {
        Self::content_type_id()
    }

    fn encode(&self, content: &FileAttachment) -> Result<EncodedContent, ContentError> {
        Ok(EncodedContent::new(self.content_type(), content.data.clone())
            .with_parameter("filename", content.filename.clone())
            .with_fallback(self.fallback(content)))
    }

    fn decode(&self, content: &EncodedContent) -> Result<FileAttachment, ContentError> {
        content.expect_type(&self.content_type())?;
        let filename = content
            .parameters
            .get("filename")
            .cloned()
            .ok_or_else(|| ContentError::InvalidContent("missing filename".to_string()))?;
        Ok(FileAttachment {
            filename,
            data: content.content.clone(),
        })
    }

    fn fallback(&self, content: &FileAttachment) -> Option<String> {
        Some(format!("Can't display \"{}\".", content.filename))
    }
}

/// Serves an already-downloaded payload from disk, whatever the url
#[derive(Debug, Clone)]
pub struct LocalFileFetcher {
    path: PathBuf,
}

impl LocalFileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RemoteContentFetcher for LocalFileFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, RemoteAttachmentError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(RemoteAttachmentError::Fetch(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(raw: &str) -> anyhow::Result<PathBuf> {
    Ok(PathBuf::from(shellexpand::full(raw)?.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_codec() {
        let file = FileAttachment {
            filename: "notes.txt".to_string(),
            data: vec![1, 2, 3],
        };
        let encoded = FileCodec.encode(&file).unwrap();

        assert_eq!(encoded.parameters["filename"], "notes.txt");
        assert_eq!(FileCodec.decode(&encoded).unwrap(), file);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = LocalFileFetcher::new(dir.path().join("absent.bin"));

        assert!(fetcher.fetch("https://example.com/x").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, b"abc").unwrap();

        let fetcher = LocalFileFetcher::new(&path);
        assert_eq!(fetcher.fetch("https://example.com/x").await.unwrap(), b"abc");
    }
}
