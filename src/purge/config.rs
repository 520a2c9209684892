use serde::Deserialize;
use std::time::Duration;

use crate::adapters::MAX_BULK_DELETE;

/// Default: simulate only
fn default_dry_run() -> bool {
    true
}

/// Default maximum number of messages counted per rule pass
fn default_max_deletions_per_run() -> u64 {
    1000
}

/// Default number of messages per bulk delete call
fn default_batch_size() -> usize {
    MAX_BULK_DELETE
}

/// Default delay after each delete call in seconds
fn default_api_call_interval() -> f64 {
    0.5
}

/// Static configuration of a deletion run
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PurgeConfig {
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    #[serde(default = "default_max_deletions_per_run")]
    pub max_deletions_per_run: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Seconds to wait after each delete call
    #[serde(default = "default_api_call_interval")]
    pub api_call_interval: f64,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            dry_run: default_dry_run(),
            max_deletions_per_run: default_max_deletions_per_run(),
            batch_size: default_batch_size(),
            api_call_interval: default_api_call_interval(),
        }
    }
}

impl PurgeConfig {
    /// Batch size clamped to what a single bulk delete call accepts
    pub fn batch_threshold(&self) -> usize {
        self.batch_size.clamp(1, MAX_BULK_DELETE)
    }

    /// Delay after each delete call; negative or invalid values mean no delay
    pub fn call_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.api_call_interval.max(0.0)).unwrap_or(Duration::ZERO)
    }
}
