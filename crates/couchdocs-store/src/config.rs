//! Store client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for talking to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Fetch documents with their attachments inlined when dumping.
    pub attachments: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            attachments: true,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
