//! Lifecycle event fan-out to subscribers

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::trace;

use crate::domain::model::{JobEvent, JobId};

type Subscribers = HashMap<u64, mpsc::UnboundedSender<JobEvent>>;

/// Delivers every job event to each attached subscriber.
///
/// Each subscriber owns an unbounded queue, so delivery is lossless and
/// ordered per subscriber and `emit` never blocks the job worker.
#[derive(Clone, Default)]
pub struct EventEmitter {
    inner: Arc<EmitterInner>,
}

#[derive(Default)]
struct EmitterInner {
    next_id: AtomicU64,
    subscribers: Mutex<Subscribers>,
}

impl EmitterInner {
    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a subscriber; it sees events emitted from now on
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers().insert(id, tx);
        trace!(subscriber = id, "Subscriber attached");

        Subscription {
            id,
            rx,
            emitter: Arc::downgrade(&self.inner),
        }
    }

    /// Push an owned copy of `event` to every subscriber
    pub fn emit(&self, event: JobEvent) {
        let mut subscribers = self.inner.subscribers();
        subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
        trace!(job_id = %event.job_id(), channel = event.channel(), "Event emitted");
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }
}

/// Subscriber handle; dropping it detaches from the emitter
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<JobEvent>,
    emitter: std::sync::Weak<EmitterInner>,
}

impl Subscription {
    /// Next event, `None` when the emitter is gone and the queue is drained
    pub async fn recv(&mut self) -> Option<JobEvent> {
        self.rx.recv().await
    }

    /// Next queued event without waiting
    pub fn try_recv(&mut self) -> Option<JobEvent> {
        self.rx.try_recv().ok()
    }

    /// Next event belonging to `job_id`; events of other jobs are skipped
    pub async fn recv_for(&mut self, job_id: JobId) -> Option<JobEvent> {
        loop {
            let event = self.rx.recv().await?;
            if event.job_id() == job_id {
                return Some(event);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.emitter.upgrade() {
            inner.subscribers().remove(&self.id);
            trace!(subscriber = self.id, "Subscriber detached");
        }
    }
}
