//! Test fixtures
//!
//! Stand-ins for the external collaborators: a fetcher that serves fixed
//! bytes, a signer that refuses, and a diagnostics observer that records.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::atomic::AtomicCell;
use crate::core_content::{RemoteAttachmentError, RemoteContentFetcher};
use crate::core_identity::{
    AccountSigner, BundleDiagnostics, DiscardedBundle, LocalWallet, SignerError, WalletSignature,
};

/// Serves the same bytes for every url
#[derive(Debug, Default)]
pub struct StubFetcher {
    payload: Vec<u8>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteContentFetcher for StubFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, RemoteAttachmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Collects every discarded bundle report
#[derive(Default)]
pub struct RecordingDiagnostics {
    discarded: AtomicCell<Vec<DiscardedBundle>>,
}

impl RecordingDiagnostics {
    pub fn discarded(&self) -> Vec<DiscardedBundle> {
        self.discarded.get()
    }
}

impl BundleDiagnostics for RecordingDiagnostics {
    fn bundle_discarded(&self, discarded: &DiscardedBundle) {
        self.discarded.mutate(|all| all.push(discarded.clone()));
    }
}

/// Signer that rejects every request
#[derive(Debug, Clone)]
pub struct RejectingSigner {
    address: String,
}

impl RejectingSigner {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl AccountSigner for RejectingSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<WalletSignature, SignerError> {
        Err(SignerError::Rejected("user declined".to_string()))
    }
}

/// Wallet with a fixed key, so repeated runs see the same address
pub fn seeded_wallet(seed: u8) -> LocalWallet {
    LocalWallet::from_seed(&[seed; 32])
}
