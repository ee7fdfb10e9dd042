//! # Structured Logging Module
//!
//! Environment-aware structured logging for pipeline operations. Console output
//! is human readable by default and switches to JSON lines when
//! `PIPELINE_LOG_FORMAT=json`.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::PipelineError;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// Safe to call more than once; only the first call installs a subscriber, and
/// an already-installed global subscriber is left in place.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let layer = if json_output_requested() {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    environment_from(|key| std::env::var(key).ok())
}

/// Resolve the environment name through `lookup`, `PIPELINE_ENV` first
fn environment_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("PIPELINE_ENV")
        .or_else(|| lookup("APP_ENV"))
        .unwrap_or_else(|| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn json_output_requested() -> bool {
    std::env::var("PIPELINE_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log a chain that used up every attempt for a message
pub fn log_chain_exhausted(
    pipeline_id: &str,
    worker_id: usize,
    exhausted: &PipelineError,
    last_error: Option<&str>,
) {
    tracing::error!(
        pipeline_id = %pipeline_id,
        worker_id = worker_id,
        error = %exhausted,
        last_error = last_error,
        timestamp = %Utc::now().to_rfc3339(),
        "Chain exhausted, message dropped"
    );
}

/// Log structured data for pipeline lifecycle operations
pub fn log_pipeline_operation(
    operation: &str,
    pipeline_id: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        pipeline_id = %pipeline_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "PIPELINE_OPERATION"
    );
}
