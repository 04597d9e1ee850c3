// ── Runtime registry configuration ──
//
// Tuning for the registries and their background refresh. Built by the
// caller (usually from `pvreg-config`); core never reads config files.

use std::time::Duration;

use crate::error::CoreError;

/// Configuration for a [`RegistryHost`](crate::RegistryHost).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// How often to run a refresh cycle (seconds). 0 = never.
    pub refresh_interval_secs: u64,
    /// Capacity of the change event channel. Must be non-zero.
    pub event_channel_size: usize,
    /// Load both registries from their stores and refresh once on `start()`.
    pub load_on_start: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            event_channel_size: 64,
            load_on_start: true,
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.event_channel_size == 0 {
            return Err(CoreError::Config {
                message: "event_channel_size must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}
