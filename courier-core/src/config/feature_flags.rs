//! Feature flag management for runtime configuration

use serde::{Deserialize, Serialize};

use crate::atomic::AtomicCell;

/// Feature flags for enabling/disabling functionality at runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Group chat content types and conversations
    pub group_chat: bool,

    /// Publish a legacy (v1) contact record next to the current one on first publish
    pub publish_legacy_contact: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            group_chat: false,
            publish_legacy_contact: true,
        }
    }
}

/// Thread-safe feature flag holder shared by a client and its services
#[derive(Debug, Default)]
pub struct FeatureManager {
    flags: AtomicCell<FeatureFlags>,
}

impl FeatureManager {
    pub fn with_flags(flags: FeatureFlags) -> Self {
        Self {
            flags: AtomicCell::new(flags),
        }
    }

    pub fn is_group_chat_enabled(&self) -> bool {
        self.flags.read(|f| f.group_chat)
    }

    pub fn is_legacy_contact_enabled(&self) -> bool {
        self.flags.read(|f| f.publish_legacy_contact)
    }

    /// Turn group chat on. Returns `true` only for the caller that flipped it.
    pub fn enable_group_chat(&self) -> bool {
        self.flags.mutate(|f| !std::mem::replace(&mut f.group_chat, true))
    }

    /// Get all current flags
    pub fn get_flags(&self) -> FeatureFlags {
        self.flags.get()
    }

    /// Replace the flags if they still equal `expected`
    pub fn update_flags(&self, expected: &FeatureFlags, new_flags: FeatureFlags) -> bool {
        self.flags.compare_and_swap(expected, new_flags)
    }
}
