//! Reclamation trigger: batches physical deletion of tombstoned tasks.
//!
//! Every successful soft delete notifies the reclaimer. The notification is a
//! non-blocking enqueue of a unit signal into a bounded queue; while the queue
//! has room the purge is deferred. The caller that finds the queue full drains
//! it (the pending signals are redundant once a purge is imminent) and runs a
//! synchronous bulk purge of all tombstoned rows. This converts one physical
//! delete per soft delete into one bulk delete per `capacity` soft deletes, at
//! the cost of bounded staleness in storage.
//!
//! The reclaimer is owned by a store instance, never process-global, so tests
//! get isolated queues for free.

use tokio::sync::Mutex;
use tokio::sync::mpsc;

/// Outcome of a soft-delete notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimDecision {
    /// Signal queued; some future saturating delete pays for the purge.
    Deferred,
    /// Queue was full and has been drained; the caller must purge now.
    PurgeNow,
}

/// Bounded signal queue coalescing soft-delete notifications.
pub struct Reclaimer {
    tx: mpsc::Sender<()>,
    rx: Mutex<mpsc::Receiver<()>>,
}

impl Reclaimer {
    /// Create a reclaimer with the given queue capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. `ReclaimConfig::validate` rejects that
    /// before a store is constructed.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "reclaim queue capacity must be at least 1");
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Record one successful soft delete.
    ///
    /// Never blocks on a full queue: saturation flips the decision to
    /// `PurgeNow` after discarding the queued signals. The queue identifies
    /// nothing — purge targets are rediscovered by scanning the tombstone
    /// flag, so dropped signals lose no work.
    pub async fn note_soft_delete(&self) -> ReclaimDecision {
        match self.tx.try_send(()) {
            Ok(()) => ReclaimDecision::Deferred,
            Err(mpsc::error::TrySendError::Full(())) => {
                self.drain().await;
                ReclaimDecision::PurgeNow
            }
            // The receiver lives inside self; closed only during teardown.
            Err(mpsc::error::TrySendError::Closed(())) => ReclaimDecision::PurgeNow,
        }
    }

    /// Discard all pending signals.
    async fn drain(&self) {
        let mut rx = self.rx.lock().await;
        while rx.try_recv().is_ok() {}
    }

    /// Number of signals currently queued.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Queue capacity.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl std::fmt::Debug for Reclaimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reclaimer")
            .field("capacity", &self.capacity())
            .field("pending", &self.pending())
            .finish()
    }
}
