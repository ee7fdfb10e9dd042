//! Shared executors and helpers for pipeline integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chain_pipeline::{Broker, Executor, Pipeline, PipelineConfig, PipelineError, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub type Message = u32;

/// Build a pipeline with a fast drain poll so tests do not wait a full second
pub fn test_pipeline(workers: usize, max_retry: u32) -> (Pipeline<Message>, Arc<Broker>) {
    chain_pipeline::logging::init_structured_logging();

    let broker = Arc::new(Broker::new());
    let config = PipelineConfig::new(workers, max_retry)
        .with_drain_poll_interval(Duration::from_millis(10));
    let pipeline = Pipeline::new(config, broker.clone()).expect("valid test config");
    (pipeline, broker)
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within 2s");
}

/// Tracing layer counting error-level events
#[derive(Clone, Default)]
pub struct ErrorEvents(Arc<AtomicUsize>);

impl ErrorEvents {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Counts applications per message and in total
#[derive(Default)]
pub struct Counting {
    pub total: AtomicUsize,
    pub per_message: DashMap<Message, usize>,
}

impl Counting {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn count_for(&self, message: Message) -> usize {
        self.per_message.get(&message).map(|c| *c).unwrap_or(0)
    }
}

#[async_trait]
impl Executor<Message> for Counting {
    fn priority(&self) -> i64 {
        0
    }

    async fn apply(&self, message: &Message) -> Result<()> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.per_message.entry(*message).or_insert(0) += 1;
        Ok(())
    }
}

/// Fails every call
#[derive(Default)]
pub struct AlwaysFail {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Executor<Message> for AlwaysFail {
    fn priority(&self) -> i64 {
        5
    }

    async fn apply(&self, message: &Message) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PipelineError::executor_failure(
            "always_fail",
            format!("message {message} rejected"),
        ))
    }

    fn name(&self) -> &str {
        "always_fail"
    }
}

/// Fails the first application for each message, succeeds afterwards
#[derive(Default)]
pub struct FailOnce {
    seen: DashMap<Message, usize>,
}

#[async_trait]
impl Executor<Message> for FailOnce {
    fn priority(&self) -> i64 {
        10
    }

    async fn apply(&self, message: &Message) -> Result<()> {
        let mut attempts = self.seen.entry(*message).or_insert(0);
        *attempts += 1;
        if *attempts == 1 {
            return Err(anyhow::anyhow!("transient failure for {message}").into());
        }
        Ok(())
    }
}

/// Blocks each application until a permit is released
pub struct Gated {
    pub permits: Arc<Semaphore>,
    pub started: AtomicUsize,
}

impl Gated {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            permits: Arc::new(Semaphore::new(0)),
            started: AtomicUsize::new(0),
        })
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn release(&self, count: usize) {
        self.permits.add_permits(count);
    }
}

#[async_trait]
impl Executor<Message> for Gated {
    fn priority(&self) -> i64 {
        100
    }

    async fn apply(&self, _message: &Message) -> Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.permits
            .acquire()
            .await
            .map_err(|e| PipelineError::executor_failure("gated", e.to_string()))?
            .forget();
        Ok(())
    }
}
