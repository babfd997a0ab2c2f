//! Identity module
//!
//! An identity is an Ed25519 identity key authorized by the account wallet,
//! plus X25519 pre-keys signed by the identity key. The private bundle is
//! persisted remotely, encrypted with a secret only the wallet can re-derive.
//!
//! - [`IdentityStore::load_or_create`] loads or bootstraps the private bundle
//! - [`AuthTokenIssuer::issue`] mints a per-call auth token from it
//! - [`AuthenticatedPublisher`] attaches such a token to each publish

mod auth;
mod bundles;
mod error;
mod keypair;
mod public_key;
mod store;
mod wallet;

pub use auth::{AuthData, AuthToken, AuthTokenIssuer, AuthenticatedPublisher};
pub use bundles::{
    EncryptedPrivateKeyBundle, PrivateKeyBundle, PrivateKeyBundleV1, PrivateKeyBundleV2,
    SignedPrivateKey, SignedPrivateKeyV2,
};
pub use error::{IdentityError, IdentityResult};
pub use keypair::{KeyType, Keypair};
pub use public_key::{
    KeySignature, PublicKey, PublicKeyBundle, SignedPublicKey, SignedPublicKeyBundle,
    UnsignedPublicKey,
};
pub use store::{
    BundleDiagnostics, DiscardReason, DiscardedBundle, IdentityStore, KeyOrigin, LoadedKeys,
};
pub use wallet::{
    identity_signature_text, normalize_address, storage_signature_text, wallet_address,
    AccountSigner, LocalWallet, SignerError, WalletSignature,
};
