//! Contact lookup and publication

use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ContactBundle, ContactResult};
use crate::atomic::AtomicCell;
use crate::core_identity::{normalize_address, AuthenticatedPublisher, PrivateKeyBundleV1};
use crate::core_transport::{Envelope, Pagination, Topic, Transport};

/// Looks up contact records, caching the ones already seen
pub struct Contacts {
    transport: Arc<dyn Transport>,
    known: AtomicCell<HashMap<String, ContactBundle>>,
}

impl Contacts {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            known: AtomicCell::default(),
        }
    }

    /// The contact record for `peer_address`
    ///
    /// The newest current-shape record wins; the newest legacy record is the
    /// fallback. Records that fail to parse, fail verification, or belong to
    /// a different wallet are ignored.
    pub async fn find(&self, peer_address: &str) -> ContactResult<Option<ContactBundle>> {
        let address = normalize_address(peer_address);
        if let Some(bundle) = self.known(&address) {
            return Ok(Some(bundle));
        }

        let envelopes = self
            .transport
            .query(&Topic::Contact(address.clone()), None)
            .await?;

        let mut legacy = None;
        for envelope in envelopes {
            let bundle = match ContactBundle::from_bytes(&envelope.message) {
                Ok(bundle) => bundle,
                Err(e) => {
                    warn!(%address, error = %e, "Ignoring unreadable contact record");
                    continue;
                }
            };
            match bundle.wallet_address() {
                Ok(owner) if normalize_address(&owner) == address => {}
                Ok(owner) => {
                    warn!(%address, %owner, "Ignoring contact record signed by another wallet");
                    continue;
                }
                Err(e) => {
                    warn!(%address, error = %e, "Ignoring unverifiable contact record");
                    continue;
                }
            }

            match bundle {
                ContactBundle::V2(_) => {
                    self.remember(&address, &bundle);
                    return Ok(Some(bundle));
                }
                ContactBundle::V1(_) if legacy.is_none() => legacy = Some(bundle),
                ContactBundle::V1(_) => {}
            }
        }

        if let Some(bundle) = &legacy {
            self.remember(&address, bundle);
        }
        Ok(legacy)
    }

    /// Cached record, without querying
    pub fn known(&self, peer_address: &str) -> Option<ContactBundle> {
        let address = normalize_address(peer_address);
        self.known.read(|known| known.get(&address).cloned())
    }

    /// Whether anything has been published under `peer_address`'s contact topic
    pub async fn can_message(&self, peer_address: &str) -> ContactResult<bool> {
        if self.known(peer_address).is_some() {
            return Ok(true);
        }
        let envelopes = self
            .transport
            .query(&Topic::Contact(peer_address.to_string()), Some(Pagination::latest(1)))
            .await?;
        Ok(!envelopes.is_empty())
    }

    fn remember(&self, address: &str, bundle: &ContactBundle) {
        self.known.mutate(|known| {
            known.insert(address.to_string(), bundle.clone());
        });
    }

    fn forget(&self, address: &str) {
        self.known.mutate(|known| {
            known.remove(address);
        });
    }
}

/// Outcome of [`ContactPublisher::ensure_published`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactStatus {
    /// The published record already matches the local keys
    UpToDate,
    Published { legacy_included: bool },
}

/// Keeps the account's own contact record in sync with its keys
pub struct ContactPublisher {
    keys: Arc<PrivateKeyBundleV1>,
    contacts: Arc<Contacts>,
    publisher: Arc<AuthenticatedPublisher>,
    publish_legacy: bool,
}

impl ContactPublisher {
    pub fn new(
        keys: Arc<PrivateKeyBundleV1>,
        contacts: Arc<Contacts>,
        publisher: Arc<AuthenticatedPublisher>,
    ) -> Self {
        Self {
            keys,
            contacts,
            publisher,
            publish_legacy: true,
        }
    }

    /// Whether a first-ever publish also writes the legacy record
    pub fn with_legacy(mut self, publish_legacy: bool) -> Self {
        self.publish_legacy = publish_legacy;
        self
    }

    /// Publish the contact record unless the store already holds one
    /// structurally equal to the local public bundle.
    ///
    /// Accounts with no record at all also get a legacy record, for peers
    /// that only read that shape.
    pub async fn ensure_published(&self) -> ContactResult<ContactStatus> {
        let address = normalize_address(self.publisher.address());
        let local = self.keys.to_v2()?.get_public_key_bundle()?;

        let existing = self.contacts.find(&address).await?;
        if matches!(&existing, Some(ContactBundle::V2(found)) if *found == local) {
            debug!(%address, "Contact record up to date");
            return Ok(ContactStatus::UpToDate);
        }

        let legacy_included = existing.is_none() && self.publish_legacy;
        self.publish(legacy_included).await?;
        Ok(ContactStatus::Published { legacy_included })
    }

    /// Publish the current record, preceded by the legacy one when `legacy` is set
    pub async fn publish(&self, legacy: bool) -> ContactResult<()> {
        let address = normalize_address(self.publisher.address());
        let topic = Topic::Contact(address.clone());
        let current = self.keys.to_v2()?.get_public_key_bundle()?;
        current.ensure_wallet_signature()?;

        let mut envelopes = Vec::with_capacity(2);
        if legacy {
            let v1 = ContactBundle::V1(self.keys.to_public_key_bundle()?);
            envelopes.push(Envelope::new(&topic, v1.to_bytes()?));
        }
        envelopes.push(Envelope::new(&topic, ContactBundle::V2(current).to_bytes()?));

        self.publisher.publish(envelopes).await?;
        self.contacts.forget(&address);

        counter!("courier.contacts.published").increment(1);
        info!(%address, legacy, "Published contact record");
        Ok(())
    }
}
