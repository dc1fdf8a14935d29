//! Status-change notifications.
//!
//! The ledger emits exactly one [`StatusChange`] per successful transition,
//! including creation, which is the transition into `Open`. Listeners are
//! infallible observers: indexers, audit sinks, test recorders.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::transaction::{Status, TransactionId};

/// A single status transition of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// The transaction that changed.
    pub id: TransactionId,
    /// The status it changed into.
    pub status: Status,
    /// When the transition was committed.
    pub at: DateTime<Utc>,
}

impl StatusChange {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn now(id: TransactionId, status: Status) -> Self {
        Self {
            id,
            status,
            at: Utc::now(),
        }
    }
}

/// Trait for status-change observers.
///
/// Implement this to feed transitions into custom destinations
/// (e.g., an indexer, a message bus, a database).
pub trait StatusListener: Send + Sync {
    /// Called once per committed transition, in commit order.
    fn on_status_change(&self, event: &StatusChange);
}

/// Listener that forwards transitions to the `tracing` infrastructure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl TracingListener {
    /// Creates a new tracing-backed listener.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl StatusListener for TracingListener {
    fn on_status_change(&self, event: &StatusChange) {
        info!(
            id = %event.id,
            status = %event.status,
            at = %event.at,
            "transaction status changed"
        );
    }
}

/// Listener that buffers every event in memory.
///
/// Used by tests to assert on the emitted stream, and usable as a staging
/// buffer for external indexers.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<StatusChange>>,
}

impl RecordingListener {
    /// Creates an empty recording listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<StatusChange> {
        self.events.lock().clone()
    }

    /// Number of events recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if no events were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drain all recorded events.
    pub fn drain(&self) -> Vec<StatusChange> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl StatusListener for RecordingListener {
    fn on_status_change(&self, event: &StatusChange) {
        self.events.lock().push(*event);
    }
}
