//! # Pipeline Configuration
//!
//! Settings that shape a [`Pipeline`](crate::pipeline::Pipeline): worker count,
//! retry budget and drain polling cadence. Values come from serde defaults, an
//! optional configuration file and `PIPELINE_*` environment variables, merged by
//! [`ConfigLoader`].
//!
//! ```rust,no_run
//! use chain_pipeline::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load(None)?;
//! println!("queue capacity: {}", config.queue_capacity());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_DRAIN_POLL_INTERVAL_MS, DEFAULT_MAX_RETRY, DEFAULT_WORKERS, QUEUE_SLOTS_PER_WORKER,
};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Root pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of parallel consumer loops
    pub workers: usize,

    /// Maximum full passes per chain invocation
    pub max_retry: u32,

    /// Interval between queue-length checks while draining
    pub drain_poll_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_retry: DEFAULT_MAX_RETRY,
            drain_poll_interval_ms: DEFAULT_DRAIN_POLL_INTERVAL_MS,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with the given worker count and retry budget
    pub fn new(workers: usize, max_retry: u32) -> Self {
        Self {
            workers,
            max_retry,
            ..Self::default()
        }
    }

    /// Override the drain polling interval
    ///
    /// Rounded down to whole milliseconds, never below 1 ms.
    pub fn with_drain_poll_interval(mut self, interval: Duration) -> Self {
        self.drain_poll_interval_ms = u64::try_from(interval.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self
    }

    /// Fixed queue capacity derived from the worker count
    pub fn queue_capacity(&self) -> usize {
        self.workers.saturating_mul(QUEUE_SLOTS_PER_WORKER)
    }

    /// Drain polling interval as a `Duration`
    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drain_poll_interval_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 {
            return Err(ConfigurationError::invalid_value(
                "workers",
                self.workers.to_string(),
                "at least one worker is required",
            ));
        }

        if self.workers.checked_mul(QUEUE_SLOTS_PER_WORKER).is_none() {
            return Err(ConfigurationError::invalid_value(
                "workers",
                self.workers.to_string(),
                "queue capacity overflows",
            ));
        }

        if self.max_retry == 0 {
            return Err(ConfigurationError::invalid_value(
                "max_retry",
                self.max_retry.to_string(),
                "a chain needs at least one attempt",
            ));
        }

        if self.drain_poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "drain_poll_interval_ms",
                self.drain_poll_interval_ms.to_string(),
                "poll interval must be positive",
            ));
        }

        Ok(())
    }
}
