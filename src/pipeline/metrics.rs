//! # Pipeline Metrics
//!
//! Lock-free counters updated by submitters and workers. Failures inside the
//! pipeline never reach submitters, so these counters and the logs are the only
//! way to observe dropped messages.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every component of one pipeline
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    submitted: AtomicU64,
    rejected: AtomicU64,
    dequeued: AtomicU64,
    task_chains_completed: AtomicU64,
    task_chains_exhausted: AtomicU64,
    result_chains_completed: AtomicU64,
    result_chains_exhausted: AtomicU64,
}

/// Point-in-time copy of [`PipelineMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub rejected: u64,
    pub dequeued: u64,
    pub task_chains_completed: u64,
    pub task_chains_exhausted: u64,
    pub result_chains_completed: u64,
    pub result_chains_exhausted: u64,
}

impl MetricsSnapshot {
    /// Messages dropped because one of their chains exhausted its attempts
    pub fn dropped(&self) -> u64 {
        self.task_chains_exhausted + self.result_chains_exhausted
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dequeued(&self) {
        self.dequeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_chain(&self, completed: bool) {
        if completed {
            self.task_chains_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.task_chains_exhausted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_result_chain(&self, completed: bool) {
        if completed {
            self.result_chains_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.result_chains_exhausted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            task_chains_completed: self.task_chains_completed.load(Ordering::Relaxed),
            task_chains_exhausted: self.task_chains_exhausted.load(Ordering::Relaxed),
            result_chains_completed: self.result_chains_completed.load(Ordering::Relaxed),
            result_chains_exhausted: self.result_chains_exhausted.load(Ordering::Relaxed),
        }
    }
}
