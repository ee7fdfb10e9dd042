//! # Executors and Executor Chains
//!
//! An [`Executor`] is one caller-supplied unit of work. An [`ExecutorChain`]
//! orders a set of executors by descending priority once, at build time, and
//! runs them as a single retryable step: any failure abandons the whole pass
//! and the next attempt starts again from the first executor.
//!
//! Executors must therefore be idempotent or cheap to re-run.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;

/// A unit of work applied to every message flowing through a chain
#[async_trait]
pub trait Executor<M>: Send + Sync {
    /// Higher priorities run earlier in the chain
    fn priority(&self) -> i64;

    /// Apply this executor to a message
    async fn apply(&self, message: &M) -> Result<()>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Result of running a chain against one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// A full pass applied every executor without failure
    Completed { attempts: u32 },
    /// Every permitted pass failed
    Exhausted {
        attempts: u32,
        last_error: Option<String>,
    },
}

impl ChainOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Number of passes that were started
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Priority-ordered executors treated as one retryable unit
pub struct ExecutorChain<M> {
    label: &'static str,
    executors: Vec<Arc<dyn Executor<M>>>,
    unconfigured: bool,
}

impl<M> fmt::Debug for ExecutorChain<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorChain")
            .field("label", &self.label)
            .field("executors", &self.executors.len())
            .field("unconfigured", &self.unconfigured)
            .finish()
    }
}

impl<M> ExecutorChain<M>
where
    M: Send + Sync + 'static,
{
    /// Build a chain, sorting executors by descending priority
    ///
    /// The sort is stable, so executors sharing a priority keep their input order.
    pub fn build(label: &'static str, mut executors: Vec<Arc<dyn Executor<M>>>) -> Self {
        executors.sort_by_key(|executor| Reverse(executor.priority()));

        debug!(
            chain = label,
            executors = ?executors.iter().map(|e| e.name()).collect::<Vec<_>>(),
            "Executor chain built"
        );

        Self {
            label,
            executors,
            unconfigured: false,
        }
    }

    /// Placeholder chain for pipelines started without executors
    ///
    /// Always completes, warning on every run.
    pub fn unconfigured(label: &'static str) -> Self {
        warn!(chain = label, "{label} chain has no executors, using an empty chain");
        Self {
            label,
            executors: Vec::new(),
            unconfigured: true,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    pub fn is_unconfigured(&self) -> bool {
        self.unconfigured
    }

    /// Executor priorities in execution order
    pub fn priorities(&self) -> Vec<i64> {
        self.executors.iter().map(|e| e.priority()).collect()
    }

    /// Run up to `max_attempts` full passes over the chain
    pub async fn run(&self, message: &M, max_attempts: u32) -> ChainOutcome {
        if self.unconfigured {
            warn!(chain = self.label, "empty {} chain called", self.label);
            return ChainOutcome::Completed { attempts: 1 };
        }

        let mut last_error = None;

        'attempts: for attempt in 1..=max_attempts {
            for executor in &self.executors {
                if let Err(e) = executor.apply(message).await {
                    debug!(
                        chain = self.label,
                        executor = executor.name(),
                        attempt = attempt,
                        max_attempts = max_attempts,
                        error = %e,
                        "Executor failed, restarting chain"
                    );
                    last_error = Some(e.to_string());
                    continue 'attempts;
                }
            }

            return ChainOutcome::Completed { attempts: attempt };
        }

        ChainOutcome::Exhausted {
            attempts: max_attempts,
            last_error,
        }
    }
}
