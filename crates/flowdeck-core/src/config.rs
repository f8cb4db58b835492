//! Runtime configuration

use std::time::Duration;

use crate::constants::polling;

/// Execution tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Delay between status fetches while a run is non-terminal
    pub poll_interval: Duration,
    /// Whether repeating fetches start enabled
    pub auto_refresh: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(polling::INTERVAL_SECS),
            auto_refresh: true,
        }
    }
}

impl TrackerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }
}
