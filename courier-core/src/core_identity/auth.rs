//! Auth tokens
//!
//! A token proves to the store that the publisher controls an identity key
//! authorized by a given wallet. Tokens are issued per publish call and are
//! never cached or shared across calls.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::bundles::PrivateKeyBundleV1;
use super::keypair::Keypair;
use super::public_key::PublicKey;
use super::wallet::normalize_address;
use super::{IdentityError, IdentityResult};
use crate::core_transport::{timestamp_now_ns, Envelope, PublishResponse, Transport};

/// Signed claim inside a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
    pub wallet_address: String,
    pub created_ns: u64,
}

impl AuthData {
    pub fn is_expired(&self, max_age: Duration) -> bool {
        let age = timestamp_now_ns().saturating_sub(self.created_ns);
        u128::from(age) > max_age.as_nanos()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// Wallet-signed identity key of the issuer
    pub identity_key: PublicKey,
    /// Serialized [`AuthData`], exactly as signed
    pub auth_data_bytes: Vec<u8>,
    /// Identity-key signature over `auth_data_bytes`
    pub auth_data_signature: Vec<u8>,
}

impl AuthToken {
    /// Check both signatures and that the claimed wallet is the one behind the identity key
    pub fn verify(&self) -> IdentityResult<AuthData> {
        if !Keypair::verify(
            &self.identity_key.public,
            &self.auth_data_bytes,
            &self.auth_data_signature,
        ) {
            return Err(IdentityError::InvalidSignature(
                "auth data is not signed by the identity key".to_string(),
            ));
        }

        let data: AuthData = bincode::deserialize(&self.auth_data_bytes)?;
        let signer = self.identity_key.recover_wallet_address()?;
        if normalize_address(&signer) != normalize_address(&data.wallet_address) {
            return Err(IdentityError::InvalidSignature(format!(
                "token claims {} but identity key belongs to {}",
                data.wallet_address, signer
            )));
        }

        Ok(data)
    }

    /// Opaque form carried in request headers
    pub fn to_base64(&self) -> IdentityResult<String> {
        Ok(STANDARD.encode(bincode::serialize(self)?))
    }

    pub fn from_base64(encoded: &str) -> IdentityResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| IdentityError::Serialization(e.to_string()))?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

/// Issues tokens from the client's v1 private bundle
#[derive(Debug, Clone)]
pub struct AuthTokenIssuer {
    address: String,
    keys: Arc<PrivateKeyBundleV1>,
}

impl AuthTokenIssuer {
    pub fn new(keys: Arc<PrivateKeyBundleV1>) -> IdentityResult<Self> {
        let address = keys.wallet_address()?;
        Ok(Self { address, keys })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Fresh token stamped with the current time. Never touches the wallet.
    pub fn issue(&self) -> IdentityResult<AuthToken> {
        let data = AuthData {
            wallet_address: self.address.clone(),
            created_ns: timestamp_now_ns(),
        };
        let auth_data_bytes = bincode::serialize(&data)?;
        let auth_data_signature = self.keys.sign(&auth_data_bytes)?;

        counter!("courier.auth.tokens_issued").increment(1);
        debug!(address = %self.address, created_ns = data.created_ns, "Issued auth token");

        Ok(AuthToken {
            identity_key: self.keys.identity_key.public_key.clone(),
            auth_data_bytes,
            auth_data_signature,
        })
    }
}

/// Publishes through a [`Transport`], attaching a freshly issued token to every call
#[derive(Clone)]
pub struct AuthenticatedPublisher {
    transport: Arc<dyn Transport>,
    issuer: AuthTokenIssuer,
}

impl AuthenticatedPublisher {
    pub fn new(transport: Arc<dyn Transport>, issuer: AuthTokenIssuer) -> Self {
        Self { transport, issuer }
    }

    pub fn address(&self) -> &str {
        self.issuer.address()
    }

    pub async fn publish(&self, envelopes: Vec<Envelope>) -> IdentityResult<PublishResponse> {
        let token = self.issuer.issue()?;
        Ok(self.transport.publish(envelopes, &token).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_identity::{AccountSigner, LocalWallet};

    async fn issuer_for(wallet: &LocalWallet) -> AuthTokenIssuer {
        let keys = PrivateKeyBundleV1::generate(wallet).await.unwrap();
        AuthTokenIssuer::new(Arc::new(keys)).unwrap()
    }

    #[tokio::test]
    async fn test_issued_token_verifies() {
        let wallet = LocalWallet::generate();
        let issuer = issuer_for(&wallet).await;

        let data = issuer.issue().unwrap().verify().unwrap();
        assert_eq!(data.wallet_address, wallet.address());
        assert!(!data.is_expired(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_tokens_are_fresh_per_issue() {
        let wallet = LocalWallet::generate();
        let issuer = issuer_for(&wallet).await;

        let first = issuer.issue().unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let second = issuer.issue().unwrap();

        assert_ne!(first.auth_data_bytes, second.auth_data_bytes);
    }

    #[tokio::test]
    async fn test_claiming_another_wallet_fails() {
        let wallet = LocalWallet::generate();
        let issuer = issuer_for(&wallet).await;
        let keys = issuer.keys.clone();

        let forged = AuthData {
            wallet_address: LocalWallet::generate().address(),
            created_ns: timestamp_now_ns(),
        };
        let auth_data_bytes = bincode::serialize(&forged).unwrap();
        let token = AuthToken {
            identity_key: keys.identity_key.public_key.clone(),
            auth_data_signature: keys.sign(&auth_data_bytes).unwrap(),
            auth_data_bytes,
        };

        assert!(matches!(token.verify(), Err(IdentityError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn test_base64_form() {
        let wallet = LocalWallet::generate();
        let token = issuer_for(&wallet).await.issue().unwrap();

        let encoded = token.to_base64().unwrap();
        assert_eq!(AuthToken::from_base64(&encoded).unwrap(), token);
        assert!(AuthToken::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_expiry_window() {
        let data = AuthData {
            wallet_address: "0x1".to_string(),
            created_ns: timestamp_now_ns() - Duration::from_secs(120).as_nanos() as u64,
        };
        assert!(data.is_expired(Duration::from_secs(60)));
        assert!(!data.is_expired(Duration::from_secs(600)));
    }
}
