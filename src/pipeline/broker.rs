//! # Lifecycle Broker
//!
//! The external lifecycle controller a pipeline reports to. It carries a single
//! stop signal fanned out to every registered component, and a wait-group style
//! counter each component decrements exactly once when it has finished draining.

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Stop signal plus outstanding-work counter
#[derive(Debug)]
pub struct Broker {
    stop: watch::Sender<bool>,
    outstanding: watch::Sender<usize>,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        let (outstanding, _) = watch::channel(0);
        Self { stop, outstanding }
    }

    /// Register one component that will later call [`Broker::done`]
    pub fn register(&self) {
        self.outstanding.send_modify(|count| *count += 1);
        debug!(outstanding = *self.outstanding.borrow(), "Broker component registered");
    }

    /// Ask every registered component to stop
    pub fn signal_stop(&self) {
        if self.stop.send_replace(true) {
            debug!("Stop already signaled");
        } else {
            info!("Stop signal broadcast");
        }
    }

    pub fn is_stopping(&self) -> bool {
        *self.stop.borrow()
    }

    /// Wait until the stop signal has been raised
    pub async fn stopped(&self) {
        let mut receiver = self.stop.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail.
        let _ = receiver.wait_for(|stopping| *stopping).await;
    }

    /// Mark one registered component as finished
    pub fn done(&self) {
        let mut underflow = false;
        self.outstanding.send_modify(|count| {
            if *count == 0 {
                underflow = true;
            } else {
                *count -= 1;
            }
        });

        if underflow {
            warn!("Broker done() called with no outstanding components");
        } else {
            debug!(outstanding = *self.outstanding.borrow(), "Broker component done");
        }
    }

    /// Components registered but not yet done
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Wait until every registered component has called [`Broker::done`]
    pub async fn wait(&self) {
        let mut receiver = self.outstanding.subscribe();
        let _ = receiver.wait_for(|count| *count == 0).await;
    }
}
