//! Pipeline error types

use thiserror::Error;

use crate::config::ConfigurationError;

/// Pipeline error type
///
/// Only `IntakeClosed` and `QueueDisconnected` are ever returned to a
/// submitter. Executor failures are absorbed by the chain retry loop and
/// exhaustion is reported through logs and metrics.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Pipeline is not accepting messages: intake closed")]
    IntakeClosed,

    #[error("Task queue disconnected: no receiver is attached")]
    QueueDisconnected,

    #[error("Executor {executor} failed: {reason}")]
    ExecutorFailure { executor: String, reason: String },

    #[error("{chain} chain exhausted after {attempts} attempts")]
    ChainExhausted { chain: String, attempts: u32 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Convenience constructor for executor implementations
    pub fn executor_failure(executor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutorFailure {
            executor: executor.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller can act on this error (drop, buffer or redirect)
    pub fn is_intake_closed(&self) -> bool {
        matches!(self, Self::IntakeClosed)
    }
}

impl From<ConfigurationError> for PipelineError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type alias for PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;
