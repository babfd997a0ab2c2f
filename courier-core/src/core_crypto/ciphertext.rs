//! AEAD output container

use serde::{Deserialize, Serialize};
use std::fmt;

/// Encrypted payload together with the parameters needed to open it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ciphertext {
    /// AES-256-GCM under a key derived with HKDF-SHA256 from the secret and `hkdf_salt`
    Aes256GcmHkdfSha256 {
        hkdf_salt: Vec<u8>,
        gcm_nonce: Vec<u8>,
        payload: Vec<u8>,
    },
}

impl Ciphertext {
    pub fn aes256_gcm_hkdf_sha256(hkdf_salt: Vec<u8>, gcm_nonce: Vec<u8>, payload: Vec<u8>) -> Self {
        Ciphertext::Aes256GcmHkdfSha256 {
            hkdf_salt,
            gcm_nonce,
            payload,
        }
    }

    pub fn salt(&self) -> &[u8] {
        match self {
            Ciphertext::Aes256GcmHkdfSha256 { hkdf_salt, .. } => hkdf_salt,
        }
    }

    pub fn nonce(&self) -> &[u8] {
        match self {
            Ciphertext::Aes256GcmHkdfSha256 { gcm_nonce, .. } => gcm_nonce,
        }
    }

    /// Encrypted bytes including the AEAD tag
    pub fn payload(&self) -> &[u8] {
        match self {
            Ciphertext::Aes256GcmHkdfSha256 { payload, .. } => payload,
        }
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes256GcmHkdfSha256")
            .field("hkdf_salt", &hex::encode(self.salt()))
            .field("gcm_nonce", &hex::encode(self.nonce()))
            .field("payload_len", &self.payload().len())
            .finish()
    }
}
