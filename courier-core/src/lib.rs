//! Courier core
//!
//! Identity bootstrap and secure envelope handling for a store-and-forward
//! messaging client.
//!
//! - [`core_identity`]: key bundles, remote key storage, auth tokens
//! - [`core_contacts`]: publishing and finding contact records
//! - [`core_content`]: content codecs and encrypted remote attachments
//! - [`core_conversation`]: conversation export and import
//! - [`client`] / [`bootstrap`]: tie the above together for one account

pub mod atomic;
pub mod bootstrap;
pub mod client;
pub mod config;
pub mod core_contacts;
pub mod core_content;
pub mod core_conversation;
pub mod core_crypto;
pub mod core_identity;
pub mod core_transport;
pub mod error;
pub mod logging;
pub mod telemetry;
pub mod test_utils;

pub use bootstrap::{BootstrapState, Bootstrapper};
pub use client::{Client, ClientOptions};
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel};
