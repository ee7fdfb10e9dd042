//! Pipeline-wide constants

/// Queue slots reserved per worker; capacity is `workers * QUEUE_SLOTS_PER_WORKER`
pub const QUEUE_SLOTS_PER_WORKER: usize = 8;

pub const DEFAULT_WORKERS: usize = 4;

pub const DEFAULT_MAX_RETRY: u32 = 3;

/// Drain polling cadence used by the shutdown coordinator
pub const DEFAULT_DRAIN_POLL_INTERVAL_MS: u64 = 1_000;

/// Prefix for environment overrides, e.g. `PIPELINE_WORKERS=8`
pub const CONFIG_ENV_PREFIX: &str = "PIPELINE";

/// Chain labels used in logs and metrics
pub mod chains {
    pub const TASK: &str = "task";
    pub const RESULT: &str = "result";
}
