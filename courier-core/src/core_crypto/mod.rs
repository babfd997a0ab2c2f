//! Crypto provider boundary
//!
//! The core never touches cipher implementations directly: it asks a
//! [`CryptoProvider`] for randomness, AEAD, hashing and signature checks.
//! [`RustCryptoProvider`] is the default backend; tests may substitute their own.

mod ciphertext;
mod error;
mod provider;

pub use ciphertext::Ciphertext;
pub use error::{CryptoError, CryptoResult};
pub use provider::{sha256, verify_ed25519, CryptoProvider, RustCryptoProvider, SECRET_LEN};
