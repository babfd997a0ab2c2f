//! Contact records
//!
//! Public key bundles published under the contact topic so peers can find
//! and verify an account before messaging it.

mod bundle;
mod contacts;
mod error;

pub use bundle::ContactBundle;
pub use contacts::{ContactPublisher, ContactStatus, Contacts};
pub use error::{ContactError, ContactResult};
