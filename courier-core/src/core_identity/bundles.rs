//! Private key bundles
//!
//! A [`PrivateKeyBundleV1`] is the one piece of identity state a client owns:
//! an Ed25519 identity key authorized by the account wallet, plus X25519
//! pre-keys signed by that identity key. Everything public is derived from it.
//!
//! At rest the bundle only ever exists as an [`EncryptedPrivateKeyBundle`]:
//! a random `wallet_pre_key` is stored in the clear, and the AEAD secret is the
//! wallet's signature over a text containing it.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::keypair::{KeyType, Keypair};
use super::public_key::{
    KeySignature, PublicKey, PublicKeyBundle, SignedPublicKey, SignedPublicKeyBundle,
    UnsignedPublicKey,
};
use super::wallet::{identity_signature_text, storage_signature_text, AccountSigner};
use super::{IdentityError, IdentityResult};
use crate::core_crypto::{Ciphertext, CryptoProvider, SECRET_LEN};
use crate::core_transport::timestamp_now_ns;

/// A private key and its signed public half (legacy shape)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPrivateKey {
    pub keypair: Keypair,
    pub public_key: PublicKey,
}

/// A private key and its signed public half (current shape)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPrivateKeyV2 {
    pub keypair: Keypair,
    pub public_key: SignedPublicKey,
}

impl SignedPrivateKeyV2 {
    fn from_legacy(key: &SignedPrivateKey) -> IdentityResult<Self> {
        Ok(Self {
            keypair: key.keypair.clone(),
            public_key: SignedPublicKey::from_legacy(&key.public_key)?,
        })
    }
}

/// Identity key plus pre-keys; the persisted form of an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKeyBundleV1 {
    pub identity_key: SignedPrivateKey,
    pub pre_keys: Vec<SignedPrivateKey>,
}

impl PrivateKeyBundleV1 {
    /// Generate a fresh identity. The account signer is asked once, to authorize the identity key.
    pub async fn generate(signer: &dyn AccountSigner) -> IdentityResult<Self> {
        let identity = Keypair::generate(KeyType::Ed25519);
        let identity_unsigned = UnsignedPublicKey {
            created_ns: timestamp_now_ns(),
            key_type: KeyType::Ed25519,
            public: identity.public_key().to_vec(),
        };
        let wallet_signature = signer
            .sign_message(&identity_signature_text(&identity_unsigned.key_bytes()?))
            .await?;

        let identity_key = SignedPrivateKey {
            public_key: PublicKey {
                created_ns: identity_unsigned.created_ns,
                key_type: identity_unsigned.key_type,
                public: identity_unsigned.public,
                signature: KeySignature::Wallet {
                    wallet_public_key: wallet_signature.public_key,
                    bytes: wallet_signature.bytes,
                },
            },
            keypair: identity,
        };

        let pre_key = Self::sign_pre_key(&identity_key.keypair, Keypair::generate(KeyType::X25519))?;

        Ok(Self {
            identity_key,
            pre_keys: vec![pre_key],
        })
    }

    fn sign_pre_key(identity: &Keypair, pre_key: Keypair) -> IdentityResult<SignedPrivateKey> {
        let unsigned = UnsignedPublicKey {
            created_ns: timestamp_now_ns(),
            key_type: pre_key.key_type,
            public: pre_key.public_key().to_vec(),
        };
        let bytes = identity.sign(&unsigned.key_bytes()?)?;

        Ok(SignedPrivateKey {
            public_key: PublicKey {
                created_ns: unsigned.created_ns,
                key_type: unsigned.key_type,
                public: unsigned.public,
                signature: KeySignature::Identity { bytes },
            },
            keypair: pre_key,
        })
    }

    /// The current (first) pre-key
    pub fn pre_key(&self) -> IdentityResult<&SignedPrivateKey> {
        self.pre_keys.first().ok_or(IdentityError::MissingPreKey)
    }

    /// Wallet address that authorized the identity key
    pub fn wallet_address(&self) -> IdentityResult<String> {
        self.identity_key.public_key.recover_wallet_address()
    }

    /// Sign with the identity key
    pub fn sign(&self, message: &[u8]) -> IdentityResult<Vec<u8>> {
        self.identity_key.keypair.sign(message)
    }

    pub fn to_public_key_bundle(&self) -> IdentityResult<PublicKeyBundle> {
        Ok(PublicKeyBundle {
            identity_key: self.identity_key.public_key.clone(),
            pre_key: self.pre_key()?.public_key.clone(),
        })
    }

    /// Deterministic current-shape projection. Never persisted.
    pub fn to_v2(&self) -> IdentityResult<PrivateKeyBundleV2> {
        Ok(PrivateKeyBundleV2 {
            identity_key: SignedPrivateKeyV2::from_legacy(&self.identity_key)?,
            pre_keys: self
                .pre_keys
                .iter()
                .map(SignedPrivateKeyV2::from_legacy)
                .collect::<IdentityResult<_>>()?,
        })
    }
}

/// Current-shape private bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKeyBundleV2 {
    pub identity_key: SignedPrivateKeyV2,
    pub pre_keys: Vec<SignedPrivateKeyV2>,
}

impl PrivateKeyBundleV2 {
    pub fn get_public_key_bundle(&self) -> IdentityResult<SignedPublicKeyBundle> {
        let pre_key = self.pre_keys.first().ok_or(IdentityError::MissingPreKey)?;
        Ok(SignedPublicKeyBundle {
            identity_key: self.identity_key.public_key.clone(),
            pre_key: pre_key.public_key.clone(),
        })
    }
}

/// Versioned private bundle as it appears inside the encrypted store record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivateKeyBundle {
    V1(PrivateKeyBundleV1),
    V2(PrivateKeyBundleV2),
}

impl PrivateKeyBundle {
    pub fn version(&self) -> &'static str {
        match self {
            PrivateKeyBundle::V1(_) => "v1",
            PrivateKeyBundle::V2(_) => "v2",
        }
    }

    pub fn to_bytes(&self) -> IdentityResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> IdentityResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Private bundle wrapped for storage on the private-store topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptedPrivateKeyBundle {
    V1 {
        /// Random input to the storage signature text; stored in the clear
        wallet_pre_key: Vec<u8>,
        ciphertext: Ciphertext,
    },
}

impl EncryptedPrivateKeyBundle {
    async fn storage_secret(
        signer: &dyn AccountSigner,
        wallet_pre_key: &[u8],
    ) -> IdentityResult<Zeroizing<Vec<u8>>> {
        let signature = signer
            .sign_message(&storage_signature_text(wallet_pre_key))
            .await?;
        Ok(Zeroizing::new(signature.bytes))
    }

    /// Encrypt `bundle` with a secret only `signer` can re-derive
    pub async fn encrypt(
        bundle: &PrivateKeyBundle,
        signer: &dyn AccountSigner,
        crypto: &dyn CryptoProvider,
    ) -> IdentityResult<Self> {
        let wallet_pre_key = crypto.random_bytes(SECRET_LEN).await?;
        let secret = Self::storage_secret(signer, &wallet_pre_key).await?;
        let plaintext = Zeroizing::new(bundle.to_bytes()?);
        let ciphertext = crypto.aead_encrypt(&secret, &plaintext).await?;

        Ok(EncryptedPrivateKeyBundle::V1 {
            wallet_pre_key,
            ciphertext,
        })
    }

    pub async fn decrypt(
        &self,
        signer: &dyn AccountSigner,
        crypto: &dyn CryptoProvider,
    ) -> IdentityResult<PrivateKeyBundle> {
        match self {
            EncryptedPrivateKeyBundle::V1 {
                wallet_pre_key,
                ciphertext,
            } => {
                let secret = Self::storage_secret(signer, wallet_pre_key).await?;
                let plaintext = Zeroizing::new(crypto.aead_decrypt(&secret, ciphertext).await?);
                PrivateKeyBundle::from_bytes(&plaintext)
            }
        }
    }

    pub fn to_bytes(&self) -> IdentityResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> IdentityResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_crypto::{CryptoError, RustCryptoProvider};
    use crate::core_identity::wallet::{AccountSigner, LocalWallet};

    #[tokio::test]
    async fn test_generated_bundle_verifies() {
        let wallet = LocalWallet::generate();
        let bundle = PrivateKeyBundleV1::generate(&wallet).await.unwrap();

        assert_eq!(bundle.wallet_address().unwrap(), wallet.address());
        assert_eq!(bundle.to_public_key_bundle().unwrap().verify().unwrap(), wallet.address());
        assert_eq!(bundle.identity_key.keypair.key_type, KeyType::Ed25519);
        assert_eq!(bundle.pre_key().unwrap().keypair.key_type, KeyType::X25519);
    }

    #[tokio::test]
    async fn test_v2_projection_is_deterministic_and_verifies() {
        let wallet = LocalWallet::generate();
        let bundle = PrivateKeyBundleV1::generate(&wallet).await.unwrap();

        let a = bundle.to_v2().unwrap().get_public_key_bundle().unwrap();
        let b = bundle.to_v2().unwrap().get_public_key_bundle().unwrap();

        assert_eq!(a, b);
        assert_eq!(a.verify().unwrap(), wallet.address());
        assert!(a.ensure_wallet_signature().is_ok());
        assert_eq!(
            a,
            SignedPublicKeyBundle::from_legacy(&bundle.to_public_key_bundle().unwrap()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_tampered_public_bundle_fails_verification() {
        let wallet = LocalWallet::generate();
        let other = LocalWallet::generate();
        let bundle = PrivateKeyBundleV1::generate(&wallet).await.unwrap();
        let foreign = PrivateKeyBundleV1::generate(&other).await.unwrap();

        let mut legacy = bundle.to_public_key_bundle().unwrap();
        legacy.pre_key = foreign.to_public_key_bundle().unwrap().pre_key;
        assert!(legacy.verify().is_err());

        let mut current = bundle.to_v2().unwrap().get_public_key_bundle().unwrap();
        current.identity_key.key_bytes[0] ^= 0xff;
        assert!(current.verify().is_err());
    }

    #[tokio::test]
    async fn test_encrypted_bundle_roundtrip() {
        let wallet = LocalWallet::generate();
        let crypto = RustCryptoProvider::new();
        let bundle = PrivateKeyBundle::V1(PrivateKeyBundleV1::generate(&wallet).await.unwrap());

        let encrypted = EncryptedPrivateKeyBundle::encrypt(&bundle, &wallet, &crypto)
            .await
            .unwrap();
        let bytes = encrypted.to_bytes().unwrap();
        let decrypted = EncryptedPrivateKeyBundle::from_bytes(&bytes)
            .unwrap()
            .decrypt(&wallet, &crypto)
            .await
            .unwrap();

        assert_eq!(decrypted, bundle);
    }

    #[tokio::test]
    async fn test_other_wallet_cannot_decrypt() {
        let wallet = LocalWallet::generate();
        let intruder = LocalWallet::generate();
        let crypto = RustCryptoProvider::new();
        let bundle = PrivateKeyBundle::V1(PrivateKeyBundleV1::generate(&wallet).await.unwrap());

        let encrypted = EncryptedPrivateKeyBundle::encrypt(&bundle, &wallet, &crypto)
            .await
            .unwrap();

        assert!(matches!(
            encrypted.decrypt(&intruder, &crypto).await,
            Err(IdentityError::Crypto(CryptoError::Decryption))
        ));
    }
}
