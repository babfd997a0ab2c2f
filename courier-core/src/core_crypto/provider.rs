//! Crypto Provider Trait
//!
//! Defines the cryptographic operations the core relies on, plus the default
//! RustCrypto-backed implementation.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{Ciphertext, CryptoError, CryptoResult};

/// Length of symmetric secrets handed to the AEAD (256 bits)
pub const SECRET_LEN: usize = 32;

/// HKDF salt length (32 bytes)
const SALT_LEN: usize = 32;

/// Nonce length for AES-GCM (12 bytes = 96 bits)
const NONCE_LEN: usize = 12;

/// SHA-256 digest of `data`
pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Check an Ed25519 signature. Malformed keys or signatures verify as `false`.
pub fn verify_ed25519(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}

/// Cryptographic operations provider
///
/// Abstracted so the identity store and attachment codec can run against
/// deterministic or instrumented providers in tests.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Return `n` cryptographically secure random bytes
    async fn random_bytes(&self, n: usize) -> CryptoResult<Vec<u8>>;

    /// Encrypt `plaintext` under `secret`; the salt and nonce are chosen by the provider
    async fn aead_encrypt(&self, secret: &[u8], plaintext: &[u8]) -> CryptoResult<Ciphertext>;

    /// Open a [`Ciphertext`] produced by [`aead_encrypt`](Self::aead_encrypt)
    async fn aead_decrypt(&self, secret: &[u8], ciphertext: &Ciphertext) -> CryptoResult<Vec<u8>>;

    /// SHA-256 digest
    fn sha256(&self, data: &[u8]) -> Vec<u8> {
        sha256(data)
    }

    /// Verify an Ed25519 signature
    fn verify_signature(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> CryptoResult<()> {
        if verify_ed25519(public_key, message, signature) {
            Ok(())
        } else {
            Err(CryptoError::InvalidSignature)
        }
    }
}

/// AES-256-GCM with an HKDF-SHA256 derived key, backed by the RustCrypto crates
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

impl RustCryptoProvider {
    pub fn new() -> Self {
        Self
    }

    fn derive_key(secret: &[u8], salt: &[u8]) -> CryptoResult<Zeroizing<[u8; 32]>> {
        let hk = Hkdf::<Sha256>::new(Some(salt), secret);
        let mut key = Zeroizing::new([0u8; 32]);
        hk.expand(&[], &mut key[..])
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }

    fn fill_random(buf: &mut [u8]) {
        rand::rng().fill_bytes(buf);
    }
}

#[async_trait]
impl CryptoProvider for RustCryptoProvider {
    async fn random_bytes(&self, n: usize) -> CryptoResult<Vec<u8>> {
        let mut bytes = vec![0u8; n];
        Self::fill_random(&mut bytes);
        Ok(bytes)
    }

    async fn aead_encrypt(&self, secret: &[u8], plaintext: &[u8]) -> CryptoResult<Ciphertext> {
        let mut salt = vec![0u8; SALT_LEN];
        Self::fill_random(&mut salt);
        let mut nonce_bytes = vec![0u8; NONCE_LEN];
        Self::fill_random(&mut nonce_bytes);

        let key = Self::derive_key(secret, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| CryptoError::Encryption(format!("Invalid key: {}", e)))?;

        let payload = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        Ok(Ciphertext::aes256_gcm_hkdf_sha256(salt, nonce_bytes, payload))
    }

    async fn aead_decrypt(&self, secret: &[u8], ciphertext: &Ciphertext) -> CryptoResult<Vec<u8>> {
        let nonce = ciphertext.nonce();
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::InvalidLength {
                field: "nonce",
                expected: NONCE_LEN,
                actual: nonce.len(),
            });
        }

        let key = Self::derive_key(secret, ciphertext.salt())?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|_| CryptoError::Decryption)?;

        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext.payload())
            .map_err(|_| CryptoError::Decryption)
    }
}
