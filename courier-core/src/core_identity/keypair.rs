//! Keypair module
//!
//! Raw key material for identity keys (Ed25519, signing) and pre-keys
//! (X25519, key agreement). Secret bytes are zeroized on drop.

use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use super::{IdentityError, IdentityResult};
use crate::core_crypto::verify_ed25519;

/// Key type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// Ed25519 for signatures
    Ed25519,
    /// X25519 for Diffie-Hellman key exchange
    X25519,
}

/// Public and secret key bytes of one key
#[derive(Clone, Serialize, Deserialize)]
pub struct Keypair {
    pub key_type: KeyType,
    /// Public key bytes (32 bytes)
    pub public: Vec<u8>,
    /// Secret key bytes (32 bytes); only ever persisted inside an encrypted bundle
    secret: Vec<u8>,
}

impl Keypair {
    /// Generate a new keypair of the specified type
    pub fn generate(key_type: KeyType) -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        let keypair = Self::from_seed(key_type, &seed);
        seed.zeroize();
        keypair
    }

    /// Rebuild a keypair from its 32-byte secret
    pub fn from_seed(key_type: KeyType, seed: &[u8; 32]) -> Self {
        match key_type {
            KeyType::Ed25519 => {
                let signing_key = SigningKey::from_bytes(seed);
                Keypair {
                    key_type,
                    public: signing_key.verifying_key().to_bytes().to_vec(),
                    secret: signing_key.to_bytes().to_vec(),
                }
            }
            KeyType::X25519 => {
                let secret = StaticSecret::from(*seed);
                let public = X25519PublicKey::from(&secret);
                Keypair {
                    key_type,
                    public: public.to_bytes().to_vec(),
                    secret: secret.to_bytes().to_vec(),
                }
            }
        }
    }

    /// Sign a message (Ed25519 only), returning the 64-byte signature
    pub fn sign(&self, msg: &[u8]) -> IdentityResult<Vec<u8>> {
        if self.key_type != KeyType::Ed25519 {
            return Err(IdentityError::InvalidKey(format!(
                "{:?} keys cannot sign",
                self.key_type
            )));
        }

        let seed: [u8; 32] = self
            .secret
            .as_slice()
            .try_into()
            .map_err(|_| IdentityError::InvalidKey("secret key must be 32 bytes".to_string()))?;
        let signing_key = SigningKey::from_bytes(&seed);

        Ok(signing_key.sign(msg).to_bytes().to_vec())
    }

    /// Verify an Ed25519 signature against a raw public key
    pub fn verify(pubkey: &[u8], msg: &[u8], sig: &[u8]) -> bool {
        verify_ed25519(pubkey, msg, sig)
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    /// Get reference to secret key (use carefully!)
    pub fn secret_key(&self) -> &[u8] {
        &self.secret
    }
}

impl PartialEq for Keypair {
    fn eq(&self, other: &Self) -> bool {
        self.key_type == other.key_type && self.public == other.public && self.secret == other.secret
    }
}

impl Eq for Keypair {}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("key_type", &self.key_type)
            .field("public", &hex::encode(&self.public))
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}
