//! # Shutdown Coordinator
//!
//! Waits for the broker's stop signal, closes intake, then polls the queue
//! length on a fixed interval until it reaches zero and reports completion to
//! the broker exactly once.
//!
//! Completion means nothing is left *enqueued*. A worker may still be running
//! the chains of the last message it dequeued when `done` fires.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::broker::Broker;
use super::queue::TaskQueue;

/// Coordinator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinatorState {
    /// Intake open, workers consuming
    Running = 0,
    /// Intake closed, waiting for the queue to empty
    Draining = 1,
    /// Completion reported to the broker
    Completed = 2,
}

impl From<u8> for CoordinatorState {
    fn from(value: u8) -> Self {
        match value {
            0 => CoordinatorState::Running,
            1 => CoordinatorState::Draining,
            _ => CoordinatorState::Completed,
        }
    }
}

/// Observable coordinator state shared with the owning pipeline
#[derive(Debug, Clone)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(CoordinatorState::Running as u8)))
    }

    pub fn get(&self) -> CoordinatorState {
        CoordinatorState::from(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: CoordinatorState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the Running → Draining transition for one pipeline
pub struct ShutdownCoordinator<M> {
    pipeline_id: Uuid,
    queue: Arc<TaskQueue<M>>,
    broker: Arc<Broker>,
    poll_interval: Duration,
    state: StateCell,
}

impl<M> ShutdownCoordinator<M>
where
    M: Send + Sync + 'static,
{
    pub fn new(
        pipeline_id: Uuid,
        queue: Arc<TaskQueue<M>>,
        broker: Arc<Broker>,
        poll_interval: Duration,
        state: StateCell,
    ) -> Self {
        Self {
            pipeline_id,
            queue,
            broker,
            poll_interval,
            state,
        }
    }

    /// Register with the broker and run the coordinator on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        self.broker.register();
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        self.broker.stopped().await;

        self.state.set(CoordinatorState::Draining);
        self.queue.close_intake();
        info!(
            pipeline_id = %self.pipeline_id,
            queued = self.queue.len(),
            "Stop signal received, intake closed, draining queue"
        );

        loop {
            let queued = self.queue.len();
            if queued == 0 {
                break;
            }
            debug!(pipeline_id = %self.pipeline_id, queued = queued, "Waiting for queue to drain");
            tokio::time::sleep(self.poll_interval).await;
        }

        self.state.set(CoordinatorState::Completed);
        info!(pipeline_id = %self.pipeline_id, "Queue drained, signaling completion");
        self.broker.done();
    }
}
