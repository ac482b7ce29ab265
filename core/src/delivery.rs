//! # Delivery: Serial Notification Contexts
//!
//! A `DeliveryContext` is where a subscriber chooses to be called. It is a
//! FIFO job queue with exactly one consumer, so everything posted to one
//! context runs in post order and never concurrently.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Serial execution context for subscriber notifications.
///
/// Cloning shares the queue: two subscribers given clones of one context are
/// notified in a single interleaved FIFO order.
#[derive(Clone)]
pub struct DeliveryContext {
    label: Arc<str>,
    tx: mpsc::UnboundedSender<Job>,
}

impl DeliveryContext {
    /// Spawn a new context on the current tokio runtime, or on a dedicated
    /// thread when called outside of one.
    pub fn dedicated(label: impl Into<String>) -> Self {
        match Handle::try_current() {
            Ok(handle) => Self::spawn_on(label, &handle),
            Err(_) => Self::spawn_thread(label),
        }
    }

    /// Spawn a new context as a task on `handle`.
    pub fn spawn_on(label: impl Into<String>, handle: &Handle) -> Self {
        let label: Arc<str> = Arc::from(label.into());
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker = label.clone();
        handle.spawn(async move {
            while let Some(job) = rx.recv().await {
                run_job(&worker, job);
            }
            tracing::trace!(tributary.delivery = %worker, "Delivery context closed");
        });
        DeliveryContext { label, tx }
    }

    fn spawn_thread(label: impl Into<String>) -> Self {
        let label: Arc<str> = Arc::from(label.into());
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker = label.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("delivery:{}", label))
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    run_job(&worker, job);
                }
            });
        if let Err(e) = spawned {
            tracing::error!(tributary.delivery = %label, error = %e, "Failed to spawn delivery thread");
        }
        DeliveryContext { label, tx }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Queue `job` behind everything already posted here.
    ///
    /// Returns `false` when the consumer is gone (its runtime shut down).
    pub fn post<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let posted = self.tx.send(Box::new(job)).is_ok();
        if !posted {
            tracing::debug!(tributary.delivery = %self.label, "Delivery context closed; job dropped");
        }
        posted
    }

    /// Check whether the consumer is still running.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

fn run_job(label: &str, job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        tracing::error!(tributary.delivery = %label, "Subscriber panicked during delivery");
    }
}

impl fmt::Debug for DeliveryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryContext")
            .field("label", &self.label)
            .field("open", &self.is_open())
            .finish()
    }
}
