/*
    Remote private-key store.

    The account's key bundle lives encrypted under its private-store topic.
    load_or_create() returns the newest bundle the account can decrypt, or
    generates, encrypts and publishes a new one when there is none.

    Stored records that fail to parse or decrypt are skipped, not fatal: a
    later record may still be usable. Skips are logged, counted and handed to
    an optional BundleDiagnostics observer.
*/

use metrics::counter;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::auth::{AuthTokenIssuer, AuthenticatedPublisher};
use super::bundles::{EncryptedPrivateKeyBundle, PrivateKeyBundle, PrivateKeyBundleV1};
use super::wallet::AccountSigner;
use super::{IdentityError, IdentityResult};
use crate::core_crypto::CryptoProvider;
use crate::core_transport::{Envelope, Topic, Transport};

/// Where the returned keys came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    Loaded,
    Generated,
}

#[derive(Debug, Clone)]
pub struct LoadedKeys {
    pub bundle: PrivateKeyBundleV1,
    pub origin: KeyOrigin,
}

/// Why a stored bundle was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// The record did not parse
    Malformed(String),
    /// The wallet's storage secret did not open it
    Undecryptable(String),
    /// It opened, but holds a bundle version that is never persisted
    UnsupportedVersion(&'static str),
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::Malformed(e) => write!(f, "malformed: {}", e),
            DiscardReason::Undecryptable(e) => write!(f, "undecryptable: {}", e),
            DiscardReason::UnsupportedVersion(v) => write!(f, "unsupported version: {}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardedBundle {
    /// Position in the newest-first query result
    pub index: usize,
    pub timestamp_ns: u64,
    pub reason: DiscardReason,
}

/// Observer for bundles skipped during load
pub trait BundleDiagnostics: Send + Sync {
    fn bundle_discarded(&self, discarded: &DiscardedBundle);
}

pub struct IdentityStore {
    transport: Arc<dyn Transport>,
    crypto: Arc<dyn CryptoProvider>,
    diagnostics: Option<Arc<dyn BundleDiagnostics>>,
}

impl IdentityStore {
    pub fn new(transport: Arc<dyn Transport>, crypto: Arc<dyn CryptoProvider>) -> Self {
        Self {
            transport,
            crypto,
            diagnostics: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn BundleDiagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Load the account's keys, creating and publishing them if none are usable.
    ///
    /// Calling this again for the same account returns the same keys and
    /// publishes nothing.
    pub async fn load_or_create(&self, signer: &dyn AccountSigner) -> IdentityResult<LoadedKeys> {
        if let Some(bundle) = self.load(signer).await? {
            info!(address = %signer.address(), "Loaded existing identity");
            return Ok(LoadedKeys {
                bundle,
                origin: KeyOrigin::Loaded,
            });
        }

        let bundle = self.create(signer).await?;
        info!(address = %signer.address(), "Created new identity");
        Ok(LoadedKeys {
            bundle,
            origin: KeyOrigin::Generated,
        })
    }

    /// Newest stored bundle that `signer` can decrypt
    ///
    /// Signer failures abort the load; they say nothing about the record.
    pub async fn load(&self, signer: &dyn AccountSigner) -> IdentityResult<Option<PrivateKeyBundleV1>> {
        let topic = Topic::PrivateStoreKeyBundle(signer.address());
        let envelopes = self.transport.query(&topic, None).await?;
        debug!(topic = %topic, count = envelopes.len(), "Queried stored bundles");

        for (index, envelope) in envelopes.iter().enumerate() {
            match self.open(envelope, signer).await {
                Ok(bundle) => return Ok(Some(bundle)),
                Err(Discard::Fatal(e)) => return Err(e),
                Err(Discard::Skip(reason)) => self.discard(DiscardedBundle {
                    index,
                    timestamp_ns: envelope.timestamp_ns,
                    reason,
                }),
            }
        }

        Ok(None)
    }

    async fn open(
        &self,
        envelope: &Envelope,
        signer: &dyn AccountSigner,
    ) -> Result<PrivateKeyBundleV1, Discard> {
        let encrypted = EncryptedPrivateKeyBundle::from_bytes(&envelope.message)
            .map_err(|e| Discard::Skip(DiscardReason::Malformed(e.to_string())))?;

        let bundle = match encrypted.decrypt(signer, self.crypto.as_ref()).await {
            Ok(bundle) => bundle,
            Err(e @ IdentityError::Signer(_)) => return Err(Discard::Fatal(e)),
            Err(e @ IdentityError::Crypto(_)) => {
                return Err(Discard::Skip(DiscardReason::Undecryptable(e.to_string())))
            }
            Err(e) => return Err(Discard::Skip(DiscardReason::Malformed(e.to_string()))),
        };

        match bundle {
            PrivateKeyBundle::V1(bundle) => Ok(bundle),
            other => Err(Discard::Skip(DiscardReason::UnsupportedVersion(other.version()))),
        }
    }

    fn discard(&self, discarded: DiscardedBundle) {
        warn!(
            index = discarded.index,
            timestamp_ns = discarded.timestamp_ns,
            reason = %discarded.reason,
            "Skipping stored key bundle"
        );
        counter!("courier.identity.bundles_discarded").increment(1);
        if let Some(diagnostics) = &self.diagnostics {
            diagnostics.bundle_discarded(&discarded);
        }
    }

    async fn create(&self, signer: &dyn AccountSigner) -> IdentityResult<PrivateKeyBundleV1> {
        let bundle = PrivateKeyBundleV1::generate(signer).await?;
        let encrypted = EncryptedPrivateKeyBundle::encrypt(
            &PrivateKeyBundle::V1(bundle.clone()),
            signer,
            self.crypto.as_ref(),
        )
        .await?;

        let keys = Arc::new(bundle);
        let publisher =
            AuthenticatedPublisher::new(self.transport.clone(), AuthTokenIssuer::new(keys.clone())?);
        let topic = Topic::PrivateStoreKeyBundle(signer.address());
        publisher
            .publish(vec![Envelope::new(&topic, encrypted.to_bytes()?)])
            .await?;

        counter!("courier.identity.bundles_created").increment(1);
        Ok(Arc::unwrap_or_clone(keys))
    }
}

enum Discard {
    Skip(DiscardReason),
    Fatal(IdentityError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_crypto::RustCryptoProvider;
    use crate::core_identity::LocalWallet;
    use crate::core_transport::InMemoryTransport;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<DiscardedBundle>>);

    impl BundleDiagnostics for Recorder {
        fn bundle_discarded(&self, discarded: &DiscardedBundle) {
            self.0.lock().unwrap().push(discarded.clone());
        }
    }

    fn store(transport: &Arc<InMemoryTransport>) -> IdentityStore {
        IdentityStore::new(transport.clone(), Arc::new(RustCryptoProvider::new()))
    }

    #[tokio::test]
    async fn test_create_then_load() {
        let transport = Arc::new(InMemoryTransport::new());
        let wallet = LocalWallet::generate();
        let store = store(&transport);

        let created = store.load_or_create(&wallet).await.unwrap();
        assert_eq!(created.origin, KeyOrigin::Generated);
        assert_eq!(transport.publish_count(), 1);

        let loaded = store.load_or_create(&wallet).await.unwrap();
        assert_eq!(loaded.origin, KeyOrigin::Loaded);
        assert_eq!(loaded.bundle, created.bundle);
        assert_eq!(transport.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_garbage_is_skipped_and_reported() {
        let transport = Arc::new(InMemoryTransport::new());
        let wallet = LocalWallet::generate();
        let recorder = Arc::new(Recorder::default());
        let store = store(&transport).with_diagnostics(recorder.clone());

        let created = store.load_or_create(&wallet).await.unwrap();
        let topic = Topic::PrivateStoreKeyBundle(wallet.address());
        transport.seed(vec![Envelope {
            topic: topic.to_string(),
            timestamp_ns: u64::MAX,
            message: b"garbage".to_vec(),
        }]);

        let loaded = store.load_or_create(&wallet).await.unwrap();
        assert_eq!(loaded.bundle, created.bundle);

        let discarded = recorder.0.lock().unwrap();
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].index, 0);
        assert!(matches!(discarded[0].reason, DiscardReason::Malformed(_)));
    }

    #[tokio::test]
    async fn test_only_undecryptable_bundles_means_create() {
        let transport = Arc::new(InMemoryTransport::new());
        let wallet = LocalWallet::generate();
        let stranger = LocalWallet::generate();
        let recorder = Arc::new(Recorder::default());

        // A bundle encrypted by another wallet, stored under this wallet's topic
        let foreign = PrivateKeyBundleV1::generate(&stranger).await.unwrap();
        let encrypted = EncryptedPrivateKeyBundle::encrypt(
            &PrivateKeyBundle::V1(foreign),
            &stranger,
            &RustCryptoProvider::new(),
        )
        .await
        .unwrap();
        transport.seed(vec![Envelope::new(
            &Topic::PrivateStoreKeyBundle(wallet.address()),
            encrypted.to_bytes().unwrap(),
        )]);

        let store = store(&transport).with_diagnostics(recorder.clone());
        let keys = store.load_or_create(&wallet).await.unwrap();

        assert_eq!(keys.origin, KeyOrigin::Generated);
        assert_eq!(transport.publish_count(), 1);
        assert!(matches!(
            recorder.0.lock().unwrap()[0].reason,
            DiscardReason::Undecryptable(_)
        ));
    }

    #[tokio::test]
    async fn test_unsupported_version_is_discarded() {
        let transport = Arc::new(InMemoryTransport::new());
        let wallet = LocalWallet::generate();
        let recorder = Arc::new(Recorder::default());

        let current = PrivateKeyBundleV1::generate(&wallet).await.unwrap().to_v2().unwrap();
        let encrypted = EncryptedPrivateKeyBundle::encrypt(
            &PrivateKeyBundle::V2(current),
            &wallet,
            &RustCryptoProvider::new(),
        )
        .await
        .unwrap();
        transport.seed(vec![Envelope::new(
            &Topic::PrivateStoreKeyBundle(wallet.address()),
            encrypted.to_bytes().unwrap(),
        )]);

        let store = store(&transport).with_diagnostics(recorder.clone());
        let keys = store.load_or_create(&wallet).await.unwrap();

        assert_eq!(keys.origin, KeyOrigin::Generated);
        assert_eq!(transport.publish_count(), 1);

        let discarded = recorder.0.lock().unwrap();
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].reason, DiscardReason::UnsupportedVersion("v2"));
    }

    #[tokio::test]
    async fn test_network_failure_is_fatal() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.set_offline(true);

        let result = store(&transport).load_or_create(&LocalWallet::generate()).await;
        assert!(matches!(result, Err(IdentityError::Transport(_))));
    }
}
