/// Ordering helpers for overlapping asynchronous fetches.
///
/// A slow earlier response must never overwrite state produced by a later
/// request: every request takes a [`Ticket`] and its result is only applied
/// while that ticket is still the newest one issued.
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket newer than every ticket issued before.
    pub fn next(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }
}

/// A value that only accepts results of the most recent request.
#[derive(Debug)]
pub struct LatestValue<T> {
    sequencer: RequestSequencer,
    slot: RwLock<Option<T>>,
}

impl<T: Clone> LatestValue<T> {
    pub fn new() -> Self {
        Self {
            sequencer: RequestSequencer::new(),
            slot: RwLock::new(None),
        }
    }

    pub fn begin(&self) -> Ticket {
        self.sequencer.next()
    }

    /// Store `value` if `ticket` is still current. Returns whether it was applied.
    pub async fn complete(&self, ticket: Ticket, value: T) -> bool {
        let mut slot = self.slot.write().await;
        // checked under the lock so a newer completion cannot interleave
        if !self.sequencer.is_current(ticket) {
            return false;
        }
        *slot = Some(value);
        true
    }

    pub async fn get(&self) -> Option<T> {
        self.slot.read().await.clone()
    }
}

impl<T: Clone> Default for LatestValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Trailing-edge debounce: a submitted job runs after `delay` unless another
/// job is submitted first, in which case the pending one is cancelled.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        }));
    }

    /// Cancel the pending job, if any.
    pub async fn cancel(&self) {
        if let Some(handle) = self.pending.lock().await.take() {
            handle.abort();
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
