#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Chain Pipeline
//!
//! Concurrent, in-process message processing: a bounded task queue feeding a
//! pool of parallel workers, each running priority-ordered executor chains with
//! whole-chain retry, and a shutdown coordinator that closes intake and drains
//! the queue before reporting completion.
//!
//! ## Module Organization
//!
//! - [`pipeline`] - Queue, executor chains, worker pool, shutdown coordinator
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//! - [`constants`] - Queue sizing and default values
//!
//! ## Delivery Semantics
//!
//! - Backpressure: `submit` suspends while the queue is full and intake is open.
//! - Fire and forget: failures inside the pipeline never reach the submitter.
//!   A message whose chain exhausts its attempts is logged, counted and dropped.
//! - Whole-chain retry: a failing executor restarts its chain from the top, so
//!   executors must tolerate being re-run.
//! - Drain: completion is reported once the queue is empty, which may be before
//!   the last dequeued message finishes processing.
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::{ConfigLoader, ConfigurationError, PipelineConfig};
pub use error::{PipelineError, Result};
pub use pipeline::broker::Broker;
pub use pipeline::coordinator::CoordinatorState;
pub use pipeline::executor::{ChainOutcome, Executor, ExecutorChain};
pub use pipeline::metrics::MetricsSnapshot;
pub use pipeline::queue::Intake;
pub use pipeline::Pipeline;
