//! Client
//!
//! Owns one bootstrapped identity and the services built on it. Everything
//! is constructed up front; nothing is initialized lazily.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bootstrap::Bootstrapper;
use crate::config::{Config, FeatureManager};
use crate::core_contacts::{ContactBundle, ContactPublisher, ContactStatus, Contacts};
use crate::core_content::{RemoteAttachmentCodec, RemoteContentFetcher};
use crate::core_conversation::{Conversation, ConversationImporter};
use crate::core_crypto::{CryptoProvider, RustCryptoProvider};
use crate::core_identity::{
    AccountSigner, AuthTokenIssuer, AuthenticatedPublisher, BundleDiagnostics, PrivateKeyBundle,
    PrivateKeyBundleV1, PrivateKeyBundleV2, SignedPublicKeyBundle,
};
use crate::core_transport::{Envelope, Pagination, PublishResponse, Topic, Transport};
use crate::error::ClientResult;

/// Construction options
#[derive(Clone)]
pub struct ClientOptions {
    pub config: Config,
    pub crypto: Arc<dyn CryptoProvider>,
    pub diagnostics: Option<Arc<dyn BundleDiagnostics>>,
}

impl ClientOptions {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_crypto(mut self, crypto: Arc<dyn CryptoProvider>) -> Self {
        self.crypto = crypto;
        self
    }

    /// Observer for stored key bundles skipped during bootstrap
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn BundleDiagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            config: Config::default(),
            crypto: Arc::new(RustCryptoProvider::new()),
            diagnostics: None,
        }
    }
}

pub struct Client {
    address: String,
    keys: Arc<PrivateKeyBundleV1>,
    transport: Arc<dyn Transport>,
    crypto: Arc<dyn CryptoProvider>,
    publisher: Arc<AuthenticatedPublisher>,
    contacts: Arc<Contacts>,
    contact_publisher: ContactPublisher,
    importer: ConversationImporter,
    features: FeatureManager,
    config: Config,
}

impl Client {
    /// Load or create the identity of `signer` and publish its contact record
    pub async fn create(
        signer: &dyn AccountSigner,
        transport: Arc<dyn Transport>,
        options: ClientOptions,
    ) -> ClientResult<Self> {
        Bootstrapper::new(transport, options).run(signer).await
    }

    /// Client for keys obtained elsewhere. Publishes nothing.
    pub fn from_bundle(
        bundle: PrivateKeyBundleV1,
        transport: Arc<dyn Transport>,
        options: ClientOptions,
    ) -> ClientResult<Self> {
        options.config.validate()?;

        let keys = Arc::new(bundle);
        let issuer = AuthTokenIssuer::new(keys.clone())?;
        let address = issuer.address().to_string();
        let publisher = Arc::new(AuthenticatedPublisher::new(transport.clone(), issuer));
        let contacts = Arc::new(Contacts::new(transport.clone()));
        let features = FeatureManager::with_flags(options.config.features.clone());
        let contact_publisher =
            ContactPublisher::new(keys.clone(), contacts.clone(), publisher.clone())
                .with_legacy(features.is_legacy_contact_enabled());

        debug!(
            %address,
            endpoint = %options.config.api.endpoint(),
            app_version = ?options.config.api.app_version,
            "Client configured"
        );

        Ok(Self {
            address,
            keys,
            transport,
            crypto: options.crypto,
            publisher,
            contacts,
            contact_publisher,
            importer: ConversationImporter::new(),
            features,
            config: options.config,
        })
    }

    /// Wallet address, as recovered from the identity key
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn crypto(&self) -> Arc<dyn CryptoProvider> {
        self.crypto.clone()
    }

    pub fn v1_keys(&self) -> &PrivateKeyBundleV1 {
        &self.keys
    }

    pub fn v2_keys(&self) -> ClientResult<PrivateKeyBundleV2> {
        Ok(self.keys.to_v2()?)
    }

    /// The private bundle in its persisted form
    pub fn private_key_bundle(&self) -> PrivateKeyBundle {
        PrivateKeyBundle::V1(self.keys.as_ref().clone())
    }

    pub fn public_key_bundle(&self) -> ClientResult<SignedPublicKeyBundle> {
        Ok(self.v2_keys()?.get_public_key_bundle()?)
    }

    pub async fn ensure_user_contact_published(&self) -> ClientResult<ContactStatus> {
        Ok(self.contact_publisher.ensure_published().await?)
    }

    /// Publish with a token issued for this call alone
    pub async fn publish(&self, envelopes: Vec<Envelope>) -> ClientResult<PublishResponse> {
        Ok(self.publisher.publish(envelopes).await?)
    }

    pub async fn query(
        &self,
        topic: &Topic,
        pagination: Option<Pagination>,
    ) -> ClientResult<Vec<Envelope>> {
        Ok(self.transport.query(topic, pagination).await?)
    }

    pub async fn subscribe(&self, topics: &[Topic]) -> ClientResult<mpsc::Receiver<Envelope>> {
        Ok(self.transport.subscribe(topics).await?)
    }

    pub async fn can_message(&self, peer_address: &str) -> ClientResult<bool> {
        Ok(self.contacts.can_message(peer_address).await?)
    }

    /// Verified contact record of `peer_address`
    pub async fn contact(&self, peer_address: &str) -> ClientResult<Option<ContactBundle>> {
        Ok(self.contacts.find(peer_address).await?)
    }

    pub fn import_conversation(&self, exported: &[u8]) -> ClientResult<Conversation> {
        Ok(self.importer.import(exported)?)
    }

    /// Attachment codec sharing this client's crypto provider
    pub fn remote_attachment_codec(
        &self,
        fetcher: Arc<dyn RemoteContentFetcher>,
    ) -> RemoteAttachmentCodec {
        RemoteAttachmentCodec::new()
            .with_fetcher(fetcher)
            .with_crypto(self.crypto.clone())
    }

    pub fn is_group_chat_enabled(&self) -> bool {
        self.features.is_group_chat_enabled()
    }

    /// Returns `true` only for the call that actually flipped the flag
    pub fn enable_group_chat(&self) -> bool {
        self.features.enable_group_chat()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.address)
            .field("env", &self.config.api.env)
            .field("endpoint", &self.config.api.endpoint())
            .field("app_version", &self.config.api.app_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_transport::InMemoryTransport;
    use crate::test_utils::seeded_wallet;

    async fn client() -> (Arc<InMemoryTransport>, Client) {
        let transport = Arc::new(InMemoryTransport::new());
        let client = Client::create(&seeded_wallet(9), transport.clone(), ClientOptions::default())
            .await
            .unwrap();
        (transport, client)
    }

    #[tokio::test]
    async fn test_address_matches_wallet() {
        let (_, client) = client().await;
        assert_eq!(client.address(), seeded_wallet(9).address());
    }

    #[tokio::test]
    async fn test_public_bundle_verifies() {
        let (_, client) = client().await;
        let bundle = client.public_key_bundle().unwrap();
        assert_eq!(bundle.verify().unwrap(), client.address());
    }

    #[tokio::test]
    async fn test_from_bundle_publishes_nothing() {
        let (transport, client) = client().await;
        let before = transport.publish_count();

        let rebuilt = Client::from_bundle(
            client.v1_keys().clone(),
            transport.clone(),
            ClientOptions::default(),
        )
        .unwrap();

        assert_eq!(rebuilt.address(), client.address());
        assert_eq!(transport.publish_count(), before);
    }

    #[tokio::test]
    async fn test_group_chat_flag_flips_once() {
        let (_, client) = client().await;
        assert!(!client.is_group_chat_enabled());

        assert!(client.enable_group_chat());
        assert!(!client.enable_group_chat());
        assert!(client.is_group_chat_enabled());
    }

    #[tokio::test]
    async fn test_debug_shows_endpoint() {
        let (_, client) = client().await;
        assert!(format!("{:?}", client).contains("https://dev.courier.network:5556"));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (transport, client) = client().await;
        let mut config = Config::default();
        config.logging.level = "loud".to_string();

        let result = Client::from_bundle(
            client.v1_keys().clone(),
            transport,
            ClientOptions::new(config),
        );
        assert!(matches!(result, Err(crate::error::ClientError::Config(_))));
    }
}
