//! Observers of expectation store mutations.

use super::core::Expectation;
use super::types::MutationCause;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Store contents captured under the write lock of a single mutation.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    /// Strictly increasing per store; a higher revision is a newer state.
    pub revision: u64,
    /// Store clock reading when the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// Full contents in match order, exhausted expectations included.
    pub expectations: Vec<Arc<Expectation>>,
}

impl StoreSnapshot {
    /// Expectations still active at the time the snapshot was taken.
    pub fn active(&self) -> impl Iterator<Item = &Arc<Expectation>> {
        self.expectations
            .iter()
            .filter(move |e| e.is_active_at(self.taken_at))
    }
}

/// Notified after every store mutation.
///
/// Called outside the store's write lock, so concurrent mutations may
/// deliver snapshots out of order; use [`StoreSnapshot::revision`] to
/// discard stale ones.
pub trait ExpectationListener: Send + Sync {
    fn updated(&self, snapshot: &StoreSnapshot, cause: MutationCause);
}
