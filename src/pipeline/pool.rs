//! # Worker Pool
//!
//! Identical consumer loops draining the shared task queue. Each message runs
//! through the task chain and, only if that completes, the result chain. A chain
//! that exhausts its attempts is logged and counted; the message is dropped and
//! never requeued.
//!
//! Workers have no stop signal of their own. A loop ends only when the queue
//! disconnects (every sender dropped) or its task is aborted.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::logging::log_chain_exhausted;

use super::executor::{ChainOutcome, ExecutorChain};
use super::metrics::PipelineMetrics;
use super::queue::SharedReceiver;

/// Everything a worker loop reads; immutable once the pool is spawned
#[derive(Debug)]
struct WorkerContext<M> {
    pipeline_id: Uuid,
    receiver: SharedReceiver<M>,
    task_chain: Arc<ExecutorChain<M>>,
    result_chain: Arc<ExecutorChain<M>>,
    max_attempts: u32,
    metrics: Arc<PipelineMetrics>,
}

/// Pool of consumer loops sharing one queue and one pair of chains
#[derive(Debug)]
pub struct WorkerPool<M> {
    context: Arc<WorkerContext<M>>,
}

impl<M> WorkerPool<M>
where
    M: Send + Sync + 'static,
{
    pub fn new(
        pipeline_id: Uuid,
        receiver: SharedReceiver<M>,
        task_chain: Arc<ExecutorChain<M>>,
        result_chain: Arc<ExecutorChain<M>>,
        max_attempts: u32,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            context: Arc::new(WorkerContext {
                pipeline_id,
                receiver,
                task_chain,
                result_chain,
                max_attempts,
                metrics,
            }),
        }
    }

    /// Launch exactly `workers` consumer loops
    pub fn spawn(&self, workers: usize) -> Vec<JoinHandle<()>> {
        info!(
            pipeline_id = %self.context.pipeline_id,
            workers = workers,
            max_attempts = self.context.max_attempts,
            "Spawning worker pool"
        );

        (0..workers)
            .map(|worker_id| {
                let context = self.context.clone();
                tokio::spawn(async move { context.consume(worker_id).await })
            })
            .collect()
    }
}

impl<M> WorkerContext<M>
where
    M: Send + Sync + 'static,
{
    async fn consume(&self, worker_id: usize) {
        debug!(pipeline_id = %self.pipeline_id, worker_id = worker_id, "Worker started");

        loop {
            // Guard is released before processing so other workers can receive.
            let next = self.receiver.lock().await.recv().await;
            let Some(message) = next else {
                info!(
                    pipeline_id = %self.pipeline_id,
                    worker_id = worker_id,
                    "Task queue disconnected, worker exiting"
                );
                break;
            };

            self.metrics.record_dequeued();
            self.process(worker_id, &message).await;
        }
    }

    async fn process(&self, worker_id: usize, message: &M) {
        let task = self.task_chain.run(message, self.max_attempts).await;
        self.metrics.record_task_chain(task.is_completed());
        if !task.is_completed() {
            self.report_exhausted(worker_id, &self.task_chain, &task);
            return;
        }

        let result = self.result_chain.run(message, self.max_attempts).await;
        self.metrics.record_result_chain(result.is_completed());
        if !result.is_completed() {
            self.report_exhausted(worker_id, &self.result_chain, &result);
        }
    }

    fn report_exhausted(&self, worker_id: usize, chain: &ExecutorChain<M>, outcome: &ChainOutcome) {
        let last_error = match outcome {
            ChainOutcome::Exhausted { last_error, .. } => last_error.as_deref(),
            ChainOutcome::Completed { .. } => None,
        };
        let exhausted = PipelineError::ChainExhausted {
            chain: chain.label().to_string(),
            attempts: outcome.attempts(),
        };

        log_chain_exhausted(
            &self.pipeline_id.to_string(),
            worker_id,
            &exhausted,
            last_error,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::chains;
    use crate::error::Result;
    use crate::pipeline::executor::Executor;
    use crate::pipeline::metrics::MetricsSnapshot;
    use crate::pipeline::queue::TaskQueue;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct Collect(Arc<Mutex<Vec<u32>>>);

    #[async_trait]
    impl Executor<u32> for Collect {
        fn priority(&self) -> i64 {
            0
        }

        async fn apply(&self, message: &u32) -> Result<()> {
            self.0.lock().push(*message);
            Ok(())
        }
    }

    struct RejectOdd;

    #[async_trait]
    impl Executor<u32> for RejectOdd {
        fn priority(&self) -> i64 {
            0
        }

        async fn apply(&self, message: &u32) -> Result<()> {
            if message % 2 == 1 {
                return Err(PipelineError::executor_failure("reject_odd", "odd message"));
            }
            Ok(())
        }
    }

    async fn wait_until(metrics: &PipelineMetrics, done: impl Fn(&MetricsSnapshot) -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if done(&metrics.snapshot()) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("workers should process every message");
    }

    #[tokio::test]
    async fn test_spawns_requested_workers_and_processes_messages() {
        let queue = TaskQueue::new(16);
        let processed = Arc::new(Mutex::new(Vec::new()));
        let metrics = Arc::new(PipelineMetrics::new());

        let pool = WorkerPool::new(
            Uuid::new_v4(),
            queue.receiver(),
            Arc::new(ExecutorChain::build(
                chains::TASK,
                vec![Arc::new(Collect(processed.clone())) as Arc<dyn Executor<u32>>],
            )),
            Arc::new(ExecutorChain::unconfigured(chains::RESULT)),
            2,
            metrics.clone(),
        );

        let handles = pool.spawn(3);
        assert_eq!(handles.len(), 3);

        for i in 0..6u32 {
            queue.submit(i).await.unwrap();
        }

        wait_until(&metrics, |s| s.result_chains_completed >= 6).await;

        let mut seen = processed.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(metrics.snapshot().result_chains_completed, 6);

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn test_exhausted_task_chain_skips_result_chain() {
        let queue = TaskQueue::new(8);
        let results = Arc::new(Mutex::new(Vec::new()));
        let metrics = Arc::new(PipelineMetrics::new());

        let pool = WorkerPool::new(
            Uuid::new_v4(),
            queue.receiver(),
            Arc::new(ExecutorChain::build(
                chains::TASK,
                vec![Arc::new(RejectOdd) as Arc<dyn Executor<u32>>],
            )),
            Arc::new(ExecutorChain::build(
                chains::RESULT,
                vec![Arc::new(Collect(results.clone())) as Arc<dyn Executor<u32>>],
            )),
            3,
            metrics.clone(),
        );
        let handles = pool.spawn(1);

        for i in 0..4u32 {
            queue.submit(i).await.unwrap();
        }

        wait_until(&metrics, |s| s.task_chains_exhausted + s.result_chains_completed >= 4).await;

        assert_eq!(*results.lock(), vec![0, 2]);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.task_chains_exhausted, 2);
        assert_eq!(snapshot.result_chains_completed, 2);

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn test_workers_exit_when_queue_disconnects() {
        let queue: TaskQueue<u32> = TaskQueue::new(8);
        let pool = WorkerPool::new(
            Uuid::new_v4(),
            queue.receiver(),
            Arc::new(ExecutorChain::unconfigured(chains::TASK)),
            Arc::new(ExecutorChain::unconfigured(chains::RESULT)),
            1,
            Arc::new(PipelineMetrics::new()),
        );
        let handles = pool.spawn(2);

        drop(queue);

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("worker should exit after disconnect")
                .unwrap();
        }
    }
}
