//! Contact records

use serde::{Deserialize, Serialize};

use super::ContactResult;
use crate::core_identity::{PublicKeyBundle, SignedPublicKeyBundle};

/// A published public bundle, in the legacy or current shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactBundle {
    V1(PublicKeyBundle),
    V2(SignedPublicKeyBundle),
}

impl ContactBundle {
    pub fn version(&self) -> u8 {
        match self {
            ContactBundle::V1(_) => 1,
            ContactBundle::V2(_) => 2,
        }
    }

    /// The bundle in the current shape. Legacy bundles convert losslessly.
    pub fn signed_bundle(&self) -> ContactResult<SignedPublicKeyBundle> {
        Ok(match self {
            ContactBundle::V1(bundle) => SignedPublicKeyBundle::from_legacy(bundle)?,
            ContactBundle::V2(bundle) => bundle.clone(),
        })
    }

    /// Wallet address the record belongs to, after checking its signatures
    pub fn wallet_address(&self) -> ContactResult<String> {
        Ok(match self {
            ContactBundle::V1(bundle) => bundle.verify()?,
            ContactBundle::V2(bundle) => bundle.verify()?,
        })
    }

    pub fn to_bytes(&self) -> ContactResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> ContactResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
