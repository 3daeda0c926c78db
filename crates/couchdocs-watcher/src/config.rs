//! Watch loop configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the polling watch loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Milliseconds between two batches.
    pub interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval() {
        let config: WatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.interval(), Duration::from_secs(1));
    }
}
