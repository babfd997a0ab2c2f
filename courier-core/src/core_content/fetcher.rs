//! Remote content fetching

use async_trait::async_trait;
use std::sync::{Arc, OnceLock};

use super::RemoteAttachmentError;

/// Retrieves the ciphertext behind a remote attachment url
///
/// Timeouts and retries belong to implementations.
#[async_trait]
pub trait RemoteContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteAttachmentError>;
}

/// Fetcher used when none is injected, built once per process
pub fn default_fetcher() -> Arc<dyn RemoteContentFetcher> {
    static DEFAULT: OnceLock<Arc<dyn RemoteContentFetcher>> = OnceLock::new();
    DEFAULT.get_or_init(build_default_fetcher).clone()
}

fn build_default_fetcher() -> Arc<dyn RemoteContentFetcher> {
    #[cfg(feature = "http-fetch")]
    {
        match http::HttpFetcher::new(&crate::config::AttachmentConfig::default()) {
            Ok(fetcher) => Arc::new(fetcher),
            Err(e) => Arc::new(UnavailableFetcher(e.to_string())),
        }
    }
    #[cfg(not(feature = "http-fetch"))]
    {
        Arc::new(UnavailableFetcher(
            "built without the http-fetch feature".to_string(),
        ))
    }
}

/// Fails every fetch; stands in when no transport for attachments exists
#[derive(Debug, Clone)]
pub struct UnavailableFetcher(String);

#[async_trait]
impl RemoteContentFetcher for UnavailableFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, RemoteAttachmentError> {
        Err(RemoteAttachmentError::Fetch(format!(
            "no fetcher available: {}",
            self.0
        )))
    }
}

#[cfg(feature = "http-fetch")]
pub use http::HttpFetcher;

#[cfg(feature = "http-fetch")]
mod http {
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use tracing::debug;

    use super::RemoteContentFetcher;
    use crate::config::AttachmentConfig;
    use crate::core_content::RemoteAttachmentError;

    /// HTTPS fetcher backed by `reqwest`
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: reqwest::Client,
        max_payload_bytes: usize,
    }

    impl HttpFetcher {
        pub fn new(config: &AttachmentConfig) -> Result<Self, RemoteAttachmentError> {
            let client = reqwest::Client::builder()
                .use_rustls_tls()
                .timeout(config.fetch_timeout)
                .build()
                .map_err(|e| RemoteAttachmentError::Fetch(e.to_string()))?;
            Ok(Self {
                client,
                max_payload_bytes: config.max_payload_bytes,
            })
        }
    }

    #[async_trait]
    impl RemoteContentFetcher for HttpFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteAttachmentError> {
            let url = reqwest::Url::parse(url)
                .map_err(|e| RemoteAttachmentError::InvalidUrl(e.to_string()))?;

            let resp = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| RemoteAttachmentError::Fetch(e.to_string()))?;

            match resp.status() {
                StatusCode::OK => {}
                StatusCode::NOT_FOUND => return Ok(Vec::new()),
                other => {
                    return Err(RemoteAttachmentError::Fetch(format!("status={}", other)));
                }
            }

            if let Some(len) = resp.content_length() {
                if len > self.max_payload_bytes as u64 {
                    return Err(RemoteAttachmentError::Fetch(format!(
                        "payload of {} bytes exceeds limit of {}",
                        len, self.max_payload_bytes
                    )));
                }
            }

            let body = resp
                .bytes()
                .await
                .map_err(|e| RemoteAttachmentError::Fetch(e.to_string()))?;
            if body.len() > self.max_payload_bytes {
                return Err(RemoteAttachmentError::Fetch(format!(
                    "payload of {} bytes exceeds limit of {}",
                    body.len(),
                    self.max_payload_bytes
                )));
            }

            debug!(%url, bytes = body.len(), "Fetched remote attachment");
            Ok(body.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fetcher_is_shared() {
        assert!(Arc::ptr_eq(&default_fetcher(), &default_fetcher()));
    }

    #[tokio::test]
    async fn test_unavailable_fetcher_fails() {
        let fetcher = UnavailableFetcher("offline".to_string());
        assert!(matches!(
            fetcher.fetch("https://example.com/a").await,
            Err(RemoteAttachmentError::Fetch(_))
        ));
    }
}
