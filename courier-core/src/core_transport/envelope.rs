//! Envelopes and topics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core_identity::normalize_address;

/// Current wall-clock time in nanoseconds since the Unix epoch
pub fn timestamp_now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Deterministic store addresses, partitioned by purpose and account
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Encrypted private key bundles of an account
    PrivateStoreKeyBundle(String),
    /// Public contact records of an account
    Contact(String),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::PrivateStoreKeyBundle(address) => write!(
                f,
                "/courier/0/privatestore-{}/key_bundle/proto",
                normalize_address(address)
            ),
            Topic::Contact(address) => {
                write!(f, "/courier/0/contact-{}/proto", normalize_address(address))
            }
        }
    }
}

/// Unit exchanged with the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    /// Advisory only: not guaranteed monotonic per publisher
    pub timestamp_ns: u64,
    pub message: Vec<u8>,
}

impl Envelope {
    /// Envelope for `topic` stamped with the current time
    pub fn new(topic: &Topic, message: Vec<u8>) -> Self {
        Self {
            topic: topic.to_string(),
            timestamp_ns: timestamp_now_ns(),
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Query window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<usize>,
    pub direction: SortDirection,
}

impl Pagination {
    pub fn latest(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            direction: SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishResponse {
    pub accepted: usize,
}
