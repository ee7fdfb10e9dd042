//! # Bounded Task Queue
//!
//! Fixed-capacity FIFO between producers and workers. Submitting to a full queue
//! suspends the caller until a worker frees a slot; submitting after intake has
//! closed fails immediately with [`PipelineError::IntakeClosed`].
//!
//! Workers share the single receiver through a mutex, so at most one worker is
//! parked on `recv` at a time and messages leave the queue in submission order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Intake gate shared between the shutdown coordinator and submitters
#[derive(Debug, Clone)]
pub struct IntakeGate {
    open: Arc<AtomicBool>,
}

impl IntakeGate {
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Close the gate; returns `true` only for the call that closed it
    pub fn close(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }
}

impl Default for IntakeGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared receiving end handed to each worker
pub type SharedReceiver<M> = Arc<Mutex<mpsc::Receiver<M>>>;

/// Cloneable producer handle
///
/// Holding an `Intake` keeps the queue connected, so workers stay alive for as
/// long as any handle exists.
#[derive(Debug)]
pub struct Intake<M> {
    sender: mpsc::Sender<M>,
    gate: IntakeGate,
}

impl<M> Clone for Intake<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<M> Intake<M>
where
    M: Send + 'static,
{
    /// Enqueue a message, waiting for space while the queue is full
    pub async fn submit(&self, message: M) -> Result<()> {
        if !self.gate.is_open() {
            debug!("Rejecting message: intake closed");
            return Err(PipelineError::IntakeClosed);
        }

        self.sender
            .send(message)
            .await
            .map_err(|_| PipelineError::QueueDisconnected)
    }

    pub fn is_accepting(&self) -> bool {
        self.gate.is_open()
    }
}

/// Bounded FIFO of messages plus its intake gate
#[derive(Debug)]
pub struct TaskQueue<M> {
    intake: Intake<M>,
    receiver: SharedReceiver<M>,
    capacity: usize,
}

impl<M> TaskQueue<M>
where
    M: Send + 'static,
{
    /// Create a queue with a fixed capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; pipeline configuration validation rules
    /// this out.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);

        info!(capacity = capacity, "Task queue created");

        Self {
            intake: Intake {
                sender,
                gate: IntakeGate::new(),
            },
            receiver: Arc::new(Mutex::new(receiver)),
            capacity,
        }
    }

    /// Enqueue a message, waiting for space while the queue is full
    pub async fn submit(&self, message: M) -> Result<()> {
        self.intake.submit(message).await
    }

    /// Producer handle sharing this queue and gate
    pub fn intake(&self) -> Intake<M> {
        self.intake.clone()
    }

    pub fn receiver(&self) -> SharedReceiver<M> {
        self.receiver.clone()
    }

    /// Messages currently buffered
    pub fn len(&self) -> usize {
        self.capacity - self.intake.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_accepting(&self) -> bool {
        self.intake.gate.is_open()
    }

    /// Stop accepting new messages; already-queued messages stay put
    pub fn close_intake(&self) -> bool {
        self.intake.gate.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_submit_is_fifo() {
        let queue = TaskQueue::new(8);
        for i in 0..5u32 {
            queue.submit(i).await.unwrap();
        }
        assert_eq!(queue.len(), 5);

        let receiver = queue.receiver();
        let mut receiver = receiver.lock().await;
        for expected in 0..5u32 {
            assert_eq!(receiver.recv().await, Some(expected));
        }
        drop(receiver);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_blocks_until_space_frees() {
        let queue = Arc::new(TaskQueue::new(8));
        for i in 0..8u32 {
            queue.submit(i).await.unwrap();
        }
        assert_eq!(queue.len(), queue.capacity());

        let blocked = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.submit(8).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        let first = queue.receiver().lock().await.recv().await;
        assert_eq!(first, Some(0));

        let result = timeout(Duration::from_secs(1), blocked)
            .await
            .expect("submit should unblock once a slot frees")
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(queue.len(), 8);
    }

    #[tokio::test]
    async fn test_closed_intake_rejects_without_blocking() {
        let queue = TaskQueue::new(8);
        for i in 0..8u32 {
            queue.submit(i).await.unwrap();
        }

        assert!(queue.close_intake());
        assert!(!queue.close_intake());
        assert!(!queue.is_accepting());

        let result = timeout(Duration::from_millis(100), queue.submit(99))
            .await
            .expect("submit must not block once intake is closed");
        assert!(matches!(result, Err(PipelineError::IntakeClosed)));
        assert_eq!(queue.len(), 8);
    }

    #[tokio::test]
    async fn test_intake_handle_shares_gate() {
        let queue = TaskQueue::new(8);
        let intake = queue.intake();

        intake.submit(1u32).await.unwrap();
        assert_eq!(queue.len(), 1);

        queue.close_intake();
        assert!(!intake.is_accepting());
        assert!(intake.submit(2).await.unwrap_err().is_intake_closed());
    }

    #[tokio::test]
    async fn test_disconnected_queue() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let intake = Intake {
            sender,
            gate: IntakeGate::new(),
        };

        let err = intake.submit(1u32).await.unwrap_err();
        assert!(matches!(err, PipelineError::QueueDisconnected));
    }
}
