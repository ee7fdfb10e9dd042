//! # Pipeline
//!
//! A bounded task queue feeding a pool of workers that run two priority-ordered
//! executor chains per message, plus a shutdown coordinator that closes intake
//! and waits for the queue to drain when the broker signals stop.
//!
//! ## Key Components
//!
//! - [`executor`] - Executor trait, chain building and whole-chain retry
//! - [`queue`] - Bounded FIFO with blocking submit and an intake gate
//! - [`pool`] - Worker loops running the task chain then the result chain
//! - [`coordinator`] - Running → Draining state machine
//! - [`broker`] - Stop signal and completion counter shared with the embedder
//! - [`metrics`] - Counters for submitted, rejected and dropped messages
//!
//! ## Usage
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use chain_pipeline::{Broker, Executor, Pipeline, PipelineConfig, Result};
//! use std::sync::Arc;
//!
//! struct Provision;
//!
//! #[async_trait]
//! impl Executor<String> for Provision {
//!     fn priority(&self) -> i64 {
//!         10
//!     }
//!
//!     async fn apply(&self, message: &String) -> Result<()> {
//!         println!("provisioning {message}");
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let broker = Arc::new(Broker::new());
//! let mut pipeline = Pipeline::new(PipelineConfig::new(2, 3), broker.clone())?;
//! pipeline.set_task_executors(vec![Arc::new(Provision)])?;
//! pipeline.run()?;
//!
//! pipeline.submit("app-1".to_string()).await?;
//!
//! broker.signal_stop();
//! broker.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod coordinator;
pub mod executor;
pub mod metrics;
pub mod pool;
pub mod queue;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::constants::chains;
use crate::error::{PipelineError, Result};
use crate::logging::log_pipeline_operation;

use self::broker::Broker;
use self::coordinator::{CoordinatorState, ShutdownCoordinator, StateCell};
use self::executor::{Executor, ExecutorChain};
use self::metrics::{MetricsSnapshot, PipelineMetrics};
use self::pool::WorkerPool;
use self::queue::{Intake, TaskQueue};

/// Concurrent message pipeline with whole-chain retry and graceful drain
pub struct Pipeline<M> {
    id: Uuid,
    config: PipelineConfig,
    queue: Arc<TaskQueue<M>>,
    broker: Arc<Broker>,
    task_chain: Option<Arc<ExecutorChain<M>>>,
    result_chain: Option<Arc<ExecutorChain<M>>>,
    metrics: Arc<PipelineMetrics>,
    coordinator_state: StateCell,
    started: AtomicBool,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<M> std::fmt::Debug for Pipeline<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("task_chain", &self.task_chain)
            .field("result_chain", &self.result_chain)
            .field("started", &self.started.load(Ordering::Acquire))
            .field("coordinator_state", &self.coordinator_state.get())
            .finish()
    }
}

impl<M> Pipeline<M>
where
    M: Send + Sync + 'static,
{
    /// Create a pipeline with a queue sized `workers * 8`
    pub fn new(config: PipelineConfig, broker: Arc<Broker>) -> Result<Self> {
        config.validate()?;

        let id = Uuid::new_v4();
        let queue = Arc::new(TaskQueue::new(config.queue_capacity()));

        info!(
            pipeline_id = %id,
            workers = config.workers,
            max_retry = config.max_retry,
            capacity = queue.capacity(),
            "Pipeline created"
        );

        Ok(Self {
            id,
            config,
            queue,
            broker,
            task_chain: None,
            result_chain: None,
            metrics: Arc::new(PipelineMetrics::new()),
            coordinator_state: StateCell::new(),
            started: AtomicBool::new(false),
            worker_handles: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// (Re)build the chain run first for every message
    pub fn set_task_executors(&mut self, executors: Vec<Arc<dyn Executor<M>>>) -> Result<()> {
        self.ensure_not_started("set task executors")?;
        self.task_chain = Some(Arc::new(ExecutorChain::build(chains::TASK, executors)));
        Ok(())
    }

    /// (Re)build the chain run after a successful task chain
    pub fn set_result_executors(&mut self, executors: Vec<Arc<dyn Executor<M>>>) -> Result<()> {
        self.ensure_not_started("set result executors")?;
        self.result_chain = Some(Arc::new(ExecutorChain::build(chains::RESULT, executors)));
        Ok(())
    }

    /// Enqueue a message; suspends while the queue is full
    ///
    /// Fails with [`PipelineError::IntakeClosed`] once the stop signal has been
    /// received. Processing failures are never reported here.
    pub async fn submit(&self, message: M) -> Result<()> {
        match self.queue.submit(message).await {
            Ok(()) => {
                self.metrics.record_submitted();
                Ok(())
            }
            Err(e) => {
                self.metrics.record_rejected();
                Err(e)
            }
        }
    }

    /// Producer handle for callers that should not hold the pipeline
    ///
    /// Submissions through the handle bypass the pipeline's submit counters.
    pub fn intake(&self) -> Intake<M> {
        self.queue.intake()
    }

    /// Launch the workers and the shutdown coordinator without blocking
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(self), fields(pipeline_id = %self.id))]
    pub fn run(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(PipelineError::InvalidState(
                "Pipeline is already running".to_string(),
            ));
        }

        let task_chain = self
            .task_chain
            .clone()
            .unwrap_or_else(|| Arc::new(ExecutorChain::unconfigured(chains::TASK)));
        let result_chain = self
            .result_chain
            .clone()
            .unwrap_or_else(|| Arc::new(ExecutorChain::unconfigured(chains::RESULT)));

        let pool = WorkerPool::new(
            self.id,
            self.queue.receiver(),
            task_chain,
            result_chain,
            self.config.max_retry,
            self.metrics.clone(),
        );
        *self.worker_handles.lock() = pool.spawn(self.config.workers);

        ShutdownCoordinator::new(
            self.id,
            self.queue.clone(),
            self.broker.clone(),
            self.config.drain_poll_interval(),
            self.coordinator_state.clone(),
        )
        .spawn();

        log_pipeline_operation(
            "run",
            &self.id.to_string(),
            "started",
            Some(&format!("{} workers", self.config.workers)),
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_accepting(&self) -> bool {
        self.queue.is_accepting()
    }

    /// Messages currently waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn coordinator_state(&self) -> CoordinatorState {
        self.coordinator_state.get()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Abort every worker loop
    ///
    /// Workers otherwise run until the process exits. Messages still queued stay
    /// queued and the message a worker was processing is abandoned mid-chain.
    pub fn abort_workers(&self) {
        let handles = std::mem::take(&mut *self.worker_handles.lock());
        if handles.is_empty() {
            return;
        }

        warn!(
            pipeline_id = %self.id,
            workers = handles.len(),
            queued = self.queue.len(),
            "Aborting worker loops"
        );
        for handle in handles {
            handle.abort();
        }
    }

    fn ensure_not_started(&self, operation: &str) -> Result<()> {
        if self.started.load(Ordering::Acquire) {
            return Err(PipelineError::InvalidState(format!(
                "cannot {operation} after the pipeline has started"
            )));
        }
        Ok(())
    }
}
