//! Remote attachments
//!
//! Content too large to inline is encrypted under a fresh secret, uploaded
//! elsewhere, and referenced from a message by url plus the parameters needed
//! to verify and open it. The digest covers the ciphertext, so a reader can
//! reject tampered bytes before decrypting anything.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::fetcher::{default_fetcher, RemoteContentFetcher};
use super::{ContentCodec, ContentTypeId, EncodedContent, RemoteAttachmentError};
use crate::core_crypto::{Ciphertext, CryptoProvider, RustCryptoProvider, SECRET_LEN};
use crate::telemetry::Timer;

/// The only url scheme remote attachments may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Https => "https://",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = RemoteAttachmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "https://" => Ok(Scheme::Https),
            other => Err(RemoteAttachmentError::InvalidScheme(format!(
                "unsupported scheme {:?}",
                other
            ))),
        }
    }
}

/// Output of [`RemoteAttachment::encode_encrypted`]: the payload to upload plus
/// everything a reader needs to verify and decrypt it
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedEncodedContent {
    pub secret: Vec<u8>,
    /// Lower-case hex SHA-256 of `payload`
    pub digest: String,
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
    pub payload: Vec<u8>,
}

impl fmt::Debug for EncryptedEncodedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedEncodedContent")
            .field("digest", &self.digest)
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

/// Reference to encrypted content stored at `url`
#[derive(Clone)]
pub struct RemoteAttachment {
    pub url: String,
    pub content_digest: String,
    pub secret: Vec<u8>,
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
    pub scheme: Scheme,
    pub content_length: Option<u64>,
    pub filename: Option<String>,
    fetcher: Arc<dyn RemoteContentFetcher>,
    crypto: Arc<dyn CryptoProvider>,
}

impl RemoteAttachment {
    /// Fails with `InvalidScheme` unless `url` starts with `https://`
    pub fn new(
        url: impl Into<String>,
        content_digest: impl Into<String>,
        secret: Vec<u8>,
        salt: Vec<u8>,
        nonce: Vec<u8>,
        scheme: Scheme,
    ) -> Result<Self, RemoteAttachmentError> {
        Self::build(
            url.into(),
            content_digest.into(),
            Keys { secret, salt, nonce },
            scheme,
            default_fetcher(),
            Arc::new(RustCryptoProvider::new()),
        )
    }

    fn build(
        url: String,
        content_digest: String,
        keys: Keys,
        scheme: Scheme,
        fetcher: Arc<dyn RemoteContentFetcher>,
        crypto: Arc<dyn CryptoProvider>,
    ) -> Result<Self, RemoteAttachmentError> {
        if !url.starts_with(scheme.as_str()) {
            return Err(RemoteAttachmentError::InvalidScheme(format!(
                "url must start with {}",
                scheme
            )));
        }

        Ok(Self {
            url,
            content_digest: content_digest.to_lowercase(),
            secret: keys.secret,
            salt: keys.salt,
            nonce: keys.nonce,
            scheme,
            content_length: None,
            filename: None,
            fetcher,
            crypto,
        })
    }

    /// Reference to `encrypted` once its payload has been uploaded to `url`
    pub fn from_encrypted(
        url: impl Into<String>,
        encrypted: &EncryptedEncodedContent,
    ) -> Result<Self, RemoteAttachmentError> {
        Self::new(
            url,
            encrypted.digest.clone(),
            encrypted.secret.clone(),
            encrypted.salt.clone(),
            encrypted.nonce.clone(),
            Scheme::Https,
        )
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn RemoteContentFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_crypto(mut self, crypto: Arc<dyn CryptoProvider>) -> Self {
        self.crypto = crypto;
        self
    }

    pub fn with_metadata(mut self, content_length: Option<u64>, filename: Option<String>) -> Self {
        self.content_length = content_length;
        self.filename = filename.filter(|name| !name.is_empty());
        self
    }

    /// Encode `content` with `codec` and encrypt it under a fresh secret
    pub async fn encode_encrypted<C: ContentCodec>(
        content: &C::Content,
        codec: &C,
        crypto: &dyn CryptoProvider,
    ) -> Result<EncryptedEncodedContent, RemoteAttachmentError> {
        let secret = Zeroizing::new(crypto.random_bytes(SECRET_LEN).await?);
        let encoded = codec
            .encode(content)
            .map_err(|e| RemoteAttachmentError::Encode(e.to_string()))?
            .to_bytes()
            .map_err(|e| RemoteAttachmentError::Encode(e.to_string()))?;

        let ciphertext = crypto.aead_encrypt(&secret, &encoded).await?;
        let Ciphertext::Aes256GcmHkdfSha256 {
            hkdf_salt,
            gcm_nonce,
            payload,
        } = ciphertext;
        let digest = hex::encode(crypto.sha256(&payload));

        Ok(EncryptedEncodedContent {
            secret: secret.to_vec(),
            digest,
            salt: hkdf_salt,
            nonce: gcm_nonce,
            payload,
        })
    }

    /// Fetch, verify and decrypt the referenced content.
    ///
    /// The digest is checked before decryption. Nothing is cached.
    pub async fn content(&self) -> Result<EncodedContent, RemoteAttachmentError> {
        let timer = Timer::new("courier.attachments.fetch.duration_ms");
        let result = self.fetch_and_open().await;
        timer.stop();
        result
    }

    async fn fetch_and_open(&self) -> Result<EncodedContent, RemoteAttachmentError> {
        let payload = self.fetcher.fetch(&self.url).await?;
        if payload.is_empty() {
            return Err(RemoteAttachmentError::PayloadNotFound);
        }

        let digest = hex::encode(self.crypto.sha256(&payload));
        if !digest.eq_ignore_ascii_case(&self.content_digest) {
            warn!(url = %self.url, "Remote attachment digest mismatch");
            return Err(RemoteAttachmentError::InvalidDigest(format!(
                "content digest does not match, expected {} got {}",
                self.content_digest, digest
            )));
        }

        let ciphertext =
            Ciphertext::aes256_gcm_hkdf_sha256(self.salt.clone(), self.nonce.clone(), payload);
        let decrypted = Zeroizing::new(self.crypto.aead_decrypt(&self.secret, &ciphertext).await?);

        debug!(url = %self.url, bytes = decrypted.len(), "Decrypted remote attachment");
        EncodedContent::from_bytes(&decrypted)
            .map_err(|e| RemoteAttachmentError::Decode(e.to_string()))
    }
}

/// Key material carried by a reference
struct Keys {
    secret: Vec<u8>,
    salt: Vec<u8>,
    nonce: Vec<u8>,
}

impl PartialEq for RemoteAttachment {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.content_digest == other.content_digest
            && self.secret == other.secret
            && self.salt == other.salt
            && self.nonce == other.nonce
            && self.scheme == other.scheme
            && self.content_length == other.content_length
            && self.filename == other.filename
    }
}

impl Eq for RemoteAttachment {}

impl fmt::Debug for RemoteAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteAttachment")
            .field("url", &self.url)
            .field("content_digest", &self.content_digest)
            .field("secret", &"[REDACTED]")
            .field("scheme", &self.scheme)
            .field("content_length", &self.content_length)
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// Encodes a [`RemoteAttachment`] reference as message content
#[derive(Clone)]
pub struct RemoteAttachmentCodec {
    fetcher: Arc<dyn RemoteContentFetcher>,
    crypto: Arc<dyn CryptoProvider>,
}

impl RemoteAttachmentCodec {
    pub fn new() -> Self {
        Self {
            fetcher: default_fetcher(),
            crypto: Arc::new(RustCryptoProvider::new()),
        }
    }

    /// Decoded attachments fetch through `fetcher`
    pub fn with_fetcher(mut self, fetcher: Arc<dyn RemoteContentFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_crypto(mut self, crypto: Arc<dyn CryptoProvider>) -> Self {
        self.crypto = crypto;
        self
    }

    pub fn content_type_id() -> ContentTypeId {
        ContentTypeId::new("courier.org", "remoteStaticAttachment", 1, 0)
    }
}

impl Default for RemoteAttachmentCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_hex(parameters: &BTreeMap<String, String>, key: &str) -> Result<Vec<u8>, RemoteAttachmentError> {
    let value = parameters
        .get(key)
        .ok_or_else(|| RemoteAttachmentError::InvalidParameters(format!("missing {}", key)))?;
    hex::decode(value.trim_start_matches("0x"))
        .map_err(|e| RemoteAttachmentError::InvalidParameters(format!("{}: {}", key, e)))
}

impl ContentCodec for RemoteAttachmentCodec {
    type Content = RemoteAttachment;
    type Error = RemoteAttachmentError;

    fn content_type(&self) -> ContentTypeId {
        Self::content_type_id()
    }

    fn encode(&self, attachment: &RemoteAttachment) -> Result<EncodedContent, RemoteAttachmentError> {
        let content_length = attachment
            .content_length
            .map(|len| len.to_string())
            .unwrap_or_else(|| "-1".to_string());

        Ok(EncodedContent::new(self.content_type(), attachment.url.as_bytes().to_vec())
            .with_parameter("contentDigest", attachment.content_digest.to_lowercase())
            .with_parameter("secret", hex::encode(&attachment.secret))
            .with_parameter("salt", hex::encode(&attachment.salt))
            .with_parameter("nonce", hex::encode(&attachment.nonce))
            .with_parameter("scheme", attachment.scheme.as_str())
            .with_parameter("contentLength", content_length)
            .with_parameter("filename", attachment.filename.clone().unwrap_or_default())
            .with_fallback(self.fallback(attachment)))
    }

    fn decode(&self, content: &EncodedContent) -> Result<RemoteAttachment, RemoteAttachmentError> {
        let url = String::from_utf8(content.content.clone())
            .map_err(|e| RemoteAttachmentError::InvalidUrl(e.to_string()))?;
        if url.is_empty() {
            return Err(RemoteAttachmentError::InvalidUrl("empty url".to_string()));
        }

        let params = &content.parameters;
        let digest = params
            .get("contentDigest")
            .ok_or_else(|| RemoteAttachmentError::InvalidDigest("missing contentDigest".to_string()))?;
        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RemoteAttachmentError::InvalidDigest(format!(
                "not a SHA-256 hex digest: {:?}",
                digest
            )));
        }

        let secret = decode_hex(params, "secret")?;
        let salt = decode_hex(params, "salt")?;
        let nonce = decode_hex(params, "nonce")?;

        let scheme: Scheme = params
            .get("scheme")
            .ok_or_else(|| RemoteAttachmentError::InvalidScheme("missing scheme".to_string()))?
            .parse()?;

        // -1 marks an unknown length
        let content_length = match params.get("contentLength").map(String::as_str) {
            None | Some("") | Some("-1") => None,
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                RemoteAttachmentError::InvalidParameters(format!("contentLength: {:?}", raw))
            })?),
        };
        let filename = params.get("filename").cloned();

        Ok(RemoteAttachment::build(
            url,
            digest.clone(),
            Keys { secret, salt, nonce },
            scheme,
            self.fetcher.clone(),
            self.crypto.clone(),
        )?
        .with_metadata(content_length, filename))
    }

    fn fallback(&self, attachment: &RemoteAttachment) -> Option<String> {
        Some(format!(
            "Can't display \"{}\". This app doesn't support attachments.",
            attachment.filename.as_deref().unwrap_or("attachment")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_content::TextCodec;
    use crate::test_utils::StubFetcher;
    use metrics::{
        Counter, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder, SharedString,
        Unit,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct Samples(Mutex<Vec<f64>>);

    impl HistogramFn for Samples {
        fn record(&self, value: f64) {
            self.0.lock().unwrap().push(value);
        }
    }

    /// Captures the fetch duration histogram only
    #[derive(Default)]
    struct FetchDurations(Arc<Samples>);

    impl FetchDurations {
        fn count(&self) -> usize {
            self.0 .0.lock().unwrap().len()
        }
    }

    impl Recorder for FetchDurations {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            if key.name() == "courier.attachments.fetch.duration_ms" {
                Histogram::from_arc(self.0.clone())
            } else {
                Histogram::noop()
            }
        }
    }

    async fn hello() -> EncryptedEncodedContent {
        RemoteAttachment::encode_encrypted(
            &"hello".to_string(),
            &TextCodec,
            &RustCryptoProvider::new(),
        )
        .await
        .unwrap()
    }

    fn attachment(encrypted: &EncryptedEncodedContent, payload: Vec<u8>) -> RemoteAttachment {
        RemoteAttachment::from_encrypted("https://example.com/a", encrypted)
            .unwrap()
            .with_fetcher(Arc::new(StubFetcher::new(payload)))
    }

    #[tokio::test]
    async fn test_digest_covers_ciphertext() {
        let encrypted = hello().await;

        assert_eq!(encrypted.secret.len(), SECRET_LEN);
        assert_eq!(encrypted.digest, hex::encode(crate::core_crypto::sha256(&encrypted.payload)));
        assert_eq!(encrypted.digest, encrypted.digest.to_lowercase());
    }

    #[tokio::test]
    async fn test_fetch_and_decrypt() {
        let encrypted = hello().await;
        let content = attachment(&encrypted, encrypted.payload.clone())
            .content()
            .await
            .unwrap();

        assert_eq!(TextCodec.decode(&content).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_empty_payload() {
        let encrypted = hello().await;
        let result = attachment(&encrypted, Vec::new()).content().await;

        assert!(matches!(result, Err(RemoteAttachmentError::PayloadNotFound)));
    }

    #[tokio::test]
    async fn test_tampered_payload_fails_before_decrypt() {
        let encrypted = hello().await;
        let mut tampered = encrypted.payload.clone();
        tampered[0] ^= 0x01;

        let result = attachment(&encrypted, tampered).content().await;
        assert!(matches!(result, Err(RemoteAttachmentError::InvalidDigest(_))));
    }

    #[tokio::test]
    async fn test_wrong_secret_is_crypto_error() {
        let encrypted = hello().await;
        let mut wrong = encrypted.clone();
        wrong.secret = vec![0u8; SECRET_LEN];

        let result = attachment(&wrong, encrypted.payload.clone()).content().await;
        assert!(matches!(result, Err(RemoteAttachmentError::Crypto(_))));
    }

    #[test]
    fn test_http_url_rejected() {
        let result = RemoteAttachment::new(
            "http://example.com/a",
            "00".repeat(32),
            vec![],
            vec![],
            vec![],
            Scheme::Https,
        );
        assert!(matches!(result, Err(RemoteAttachmentError::InvalidScheme(_))));
    }

    #[tokio::test]
    async fn test_codec_parameters() {
        let encrypted = hello().await;
        let reference = attachment(&encrypted, vec![])
            .with_metadata(Some(5), Some("hello.txt".to_string()));

        let codec = RemoteAttachmentCodec::new();
        let encoded = codec.encode(&reference).unwrap();

        assert_eq!(encoded.content, b"https://example.com/a");
        assert_eq!(encoded.parameters["contentDigest"], encrypted.digest);
        assert_eq!(encoded.parameters["secret"], hex::encode(&encrypted.secret));
        assert_eq!(encoded.parameters["scheme"], "https://");
        assert_eq!(encoded.parameters["contentLength"], "5");
        assert_eq!(encoded.parameters["filename"], "hello.txt");

        assert_eq!(codec.decode(&encoded).unwrap(), reference);
    }

    #[tokio::test]
    async fn test_codec_unknown_length_and_filename() {
        let encrypted = hello().await;
        let reference = attachment(&encrypted, vec![]);
        let codec = RemoteAttachmentCodec::new();

        let encoded = codec.encode(&reference).unwrap();
        assert_eq!(encoded.parameters["contentLength"], "-1");
        assert_eq!(encoded.parameters["filename"], "");

        let decoded = codec.decode(&encoded).unwrap();
        assert_eq!(decoded.content_length, None);
        assert_eq!(decoded.filename, None);
    }

    #[tokio::test]
    async fn test_decode_errors_are_distinct() {
        let encrypted = hello().await;
        let codec = RemoteAttachmentCodec::new();
        let encoded = codec.encode(&attachment(&encrypted, vec![])).unwrap();

        let mut bad_url = encoded.clone();
        bad_url.content = vec![0xff, 0xfe];
        assert!(matches!(codec.decode(&bad_url), Err(RemoteAttachmentError::InvalidUrl(_))));

        let mut bad_digest = encoded.clone();
        bad_digest.parameters.remove("contentDigest");
        assert!(matches!(
            codec.decode(&bad_digest),
            Err(RemoteAttachmentError::InvalidDigest(_))
        ));

        let mut bad_salt = encoded.clone();
        bad_salt.parameters.insert("salt".to_string(), "zz".to_string());
        assert!(matches!(
            codec.decode(&bad_salt),
            Err(RemoteAttachmentError::InvalidParameters(_))
        ));

        let mut bad_scheme = encoded.clone();
        bad_scheme.parameters.insert("scheme".to_string(), "http://".to_string());
        assert!(matches!(
            codec.decode(&bad_scheme),
            Err(RemoteAttachmentError::InvalidScheme(_))
        ));

        let mut insecure = encoded;
        insecure.content = b"http://example.com/a".to_vec();
        assert!(matches!(
            codec.decode(&insecure),
            Err(RemoteAttachmentError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_content_length_only_minus_one_is_unknown() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let encrypted = runtime.block_on(hello());
        let codec = RemoteAttachmentCodec::new();
        let encoded = codec.encode(&attachment(&encrypted, vec![])).unwrap();

        for raw in ["-2", "-100", "five"] {
            let mut bad = encoded.clone();
            bad.parameters.insert("contentLength".to_string(), raw.to_string());
            assert!(matches!(
                codec.decode(&bad),
                Err(RemoteAttachmentError::InvalidParameters(_))
            ));
        }

        let mut known = encoded;
        known.parameters.insert("contentLength".to_string(), "42".to_string());
        assert_eq!(codec.decode(&known).unwrap().content_length, Some(42));
    }

    #[test]
    fn test_fetch_duration_recorded_on_failure() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let recorder = FetchDurations::default();
        let encrypted = runtime.block_on(hello());

        let mut tampered = encrypted.payload.clone();
        tampered[0] ^= 0x01;
        let failures = [attachment(&encrypted, Vec::new()), attachment(&encrypted, tampered)];

        metrics::with_local_recorder(&recorder, || {
            for reference in &failures {
                assert!(runtime.block_on(reference.content()).is_err());
            }
            let ok = attachment(&encrypted, encrypted.payload.clone());
            assert!(runtime.block_on(ok.content()).is_ok());
        });

        assert_eq!(recorder.count(), 3);
    }
}
