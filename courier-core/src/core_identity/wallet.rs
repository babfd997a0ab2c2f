//! Account (wallet) signing
//!
//! The account signer owns the long-lived wallet key. It is asked to sign in
//! two places only: once to authorize a freshly generated identity key, and
//! each time a stored key bundle is encrypted or decrypted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::keypair::{KeyType, Keypair};
use crate::core_crypto::{sha256, verify_ed25519};

/// Errors surfaced by an account signer
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Signature request rejected: {0}")]
    Rejected(String),

    #[error("Signer unavailable: {0}")]
    Unavailable(String),
}

/// Signature produced by an account signer, carrying the key needed to verify it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSignature {
    pub public_key: Vec<u8>,
    pub bytes: Vec<u8>,
}

impl WalletSignature {
    /// Verify over `message` and return the address of the signing wallet
    pub fn recover_address(&self, message: &[u8]) -> Option<String> {
        verify_ed25519(&self.public_key, message, &self.bytes)
            .then(|| wallet_address(&self.public_key))
    }
}

/// The account whose identity is being bootstrapped
#[async_trait]
pub trait AccountSigner: Send + Sync {
    /// Address of the account, `0x`-prefixed
    fn address(&self) -> String;

    /// Sign an arbitrary message with the account key
    ///
    /// Signatures must be deterministic: stored bundles are decrypted with a
    /// secret re-derived from signing the same text again.
    async fn sign_message(&self, message: &[u8]) -> Result<WalletSignature, SignerError>;
}

/// Address derived from a wallet public key: `0x` + last 20 bytes of its SHA-256
pub fn wallet_address(public_key: &[u8]) -> String {
    let digest = sha256(public_key);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Canonical form of an address used in topics and comparisons
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Text the wallet signs to authorize an identity key
pub fn identity_signature_text(key_bytes: &[u8]) -> Vec<u8> {
    format!(
        "Courier : Create Identity\n{}\n\nFor more info: https://courier.network/signatures/",
        hex::encode(key_bytes)
    )
    .into_bytes()
}

/// Text the wallet signs to derive the storage secret for an encrypted key bundle
pub fn storage_signature_text(wallet_pre_key: &[u8]) -> Vec<u8> {
    format!(
        "Courier : Enable Identity\n{}\n\nFor more info: https://courier.network/signatures/",
        hex::encode(wallet_pre_key)
    )
    .into_bytes()
}

/// Ed25519-backed account signer holding its key in memory
#[derive(Debug, Clone)]
pub struct LocalWallet {
    keypair: Keypair,
}

impl LocalWallet {
    pub fn generate() -> Self {
        Self {
            keypair: Keypair::generate(KeyType::Ed25519),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(KeyType::Ed25519, seed),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        self.keypair.public_key()
    }
}

#[async_trait]
impl AccountSigner for LocalWallet {
    fn address(&self) -> String {
        wallet_address(self.keypair.public_key())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<WalletSignature, SignerError> {
        let bytes = self
            .keypair
            .sign(message)
            .map_err(|e| SignerError::Unavailable(e.to_string()))?;

        Ok(WalletSignature {
            public_key: self.keypair.public_key().to_vec(),
            bytes,
        })
    }
}
