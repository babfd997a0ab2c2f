//! Public key records
//!
//! Two shapes coexist. The legacy [`PublicKey`] carries its fields inline;
//! the current [`SignedPublicKey`] carries the exact serialized bytes that were
//! signed. Both are derived from the same signatures, so a legacy key can be
//! converted to the current shape without asking anyone to sign again.

use serde::{Deserialize, Serialize};

use super::keypair::{KeyType, Keypair};
use super::wallet::{identity_signature_text, wallet_address};
use super::{IdentityError, IdentityResult};

/// The signed portion of a public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedPublicKey {
    pub created_ns: u64,
    pub key_type: KeyType,
    pub public: Vec<u8>,
}

impl UnsignedPublicKey {
    /// Canonical bytes covered by the key's signature
    pub fn key_bytes(&self) -> IdentityResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_key_bytes(bytes: &[u8]) -> IdentityResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Who vouches for a public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeySignature {
    /// Pre-keys: signed by the identity key over the key bytes
    Identity { bytes: Vec<u8> },
    /// Identity keys: signed by the account wallet over the identity text
    Wallet {
        wallet_public_key: Vec<u8>,
        bytes: Vec<u8>,
    },
}

impl KeySignature {
    /// Check the signature over `key_bytes`.
    ///
    /// Wallet signatures return the recovered wallet address; identity
    /// signatures are checked against `identity_public`.
    fn verify(&self, key_bytes: &[u8], identity_public: Option<&[u8]>) -> IdentityResult<Option<String>> {
        match self {
            KeySignature::Wallet {
                wallet_public_key,
                bytes,
            } => {
                let text = identity_signature_text(key_bytes);
                if Keypair::verify(wallet_public_key, &text, bytes) {
                    Ok(Some(wallet_address(wallet_public_key)))
                } else {
                    Err(IdentityError::InvalidSignature(
                        "wallet signature does not match identity key".to_string(),
                    ))
                }
            }
            KeySignature::Identity { bytes } => {
                let signer = identity_public.ok_or_else(|| {
                    IdentityError::InvalidSignature("identity-signed key without signer".to_string())
                })?;
                if Keypair::verify(signer, key_bytes, bytes) {
                    Ok(None)
                } else {
                    Err(IdentityError::InvalidSignature(
                        "pre-key is not signed by the identity key".to_string(),
                    ))
                }
            }
        }
    }
}

/// Legacy public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub created_ns: u64,
    pub key_type: KeyType,
    pub public: Vec<u8>,
    pub signature: KeySignature,
}

impl PublicKey {
    pub fn unsigned(&self) -> UnsignedPublicKey {
        UnsignedPublicKey {
            created_ns: self.created_ns,
            key_type: self.key_type,
            public: self.public.clone(),
        }
    }

    /// Address of the wallet that authorized this identity key
    pub fn recover_wallet_address(&self) -> IdentityResult<String> {
        let key_bytes = self.unsigned().key_bytes()?;
        self.signature
            .verify(&key_bytes, None)?
            .ok_or_else(|| IdentityError::InvalidSignature("key is not wallet-signed".to_string()))
    }

    /// Whether `identity` signed this key
    pub fn is_signed_by(&self, identity: &PublicKey) -> bool {
        self.unsigned()
            .key_bytes()
            .and_then(|bytes| self.signature.verify(&bytes, Some(&identity.public)))
            .is_ok()
    }
}

/// Current public key: signed bytes plus signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPublicKey {
    pub key_bytes: Vec<u8>,
    pub signature: KeySignature,
}

impl SignedPublicKey {
    /// Re-express a legacy key; the signature is carried over unchanged
    pub fn from_legacy(key: &PublicKey) -> IdentityResult<Self> {
        Ok(Self {
            key_bytes: key.unsigned().key_bytes()?,
            signature: key.signature.clone(),
        })
    }

    pub fn public_key(&self) -> IdentityResult<UnsignedPublicKey> {
        UnsignedPublicKey::from_key_bytes(&self.key_bytes)
    }

    pub fn recover_wallet_address(&self) -> IdentityResult<String> {
        self.signature
            .verify(&self.key_bytes, None)?
            .ok_or_else(|| IdentityError::InvalidSignature("key is not wallet-signed".to_string()))
    }

    fn verify_signed_by(&self, identity: &SignedPublicKey) -> IdentityResult<()> {
        let identity = identity.public_key()?;
        self.signature
            .verify(&self.key_bytes, Some(&identity.public))
            .map(|_| ())
    }
}

/// Legacy public bundle, as published in v1 contact records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyBundle {
    pub identity_key: PublicKey,
    pub pre_key: PublicKey,
}

impl PublicKeyBundle {
    /// Check both signatures and return the owning wallet address
    pub fn verify(&self) -> IdentityResult<String> {
        let address = self.identity_key.recover_wallet_address()?;
        if !self.pre_key.is_signed_by(&self.identity_key) {
            return Err(IdentityError::InvalidSignature(
                "pre-key is not signed by the identity key".to_string(),
            ));
        }
        Ok(address)
    }
}

/// Current public bundle, as published in v2 contact records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPublicKeyBundle {
    pub identity_key: SignedPublicKey,
    pub pre_key: SignedPublicKey,
}

impl SignedPublicKeyBundle {
    pub fn from_legacy(bundle: &PublicKeyBundle) -> IdentityResult<Self> {
        Ok(Self {
            identity_key: SignedPublicKey::from_legacy(&bundle.identity_key)?,
            pre_key: SignedPublicKey::from_legacy(&bundle.pre_key)?,
        })
    }

    /// Check both signatures and return the owning wallet address
    pub fn verify(&self) -> IdentityResult<String> {
        let address = self.identity_key.recover_wallet_address()?;
        self.pre_key.verify_signed_by(&self.identity_key)?;
        Ok(address)
    }

    /// Identity keys must be wallet-signed before the bundle is published
    pub fn ensure_wallet_signature(&self) -> IdentityResult<()> {
        match self.identity_key.signature {
            KeySignature::Wallet { .. } => Ok(()),
            KeySignature::Identity { .. } => Err(IdentityError::InvalidSignature(
                "identity key must carry a wallet signature".to_string(),
            )),
        }
    }
}
