//! Ordered, priority-aware expectation store.

use super::core::Expectation;
use super::listener::{ExpectationListener, StoreSnapshot};
use super::types::{ExpectationError, MutationCause};
use crate::clock::{Clock, SystemClock};
use crate::model::HttpRequest;
use crate::predicate::{HttpRequestMatcher, MatchDifference};
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_EXPECTATIONS: usize = 5000;

#[derive(Debug, Clone)]
struct Entry {
    expectation: Arc<Expectation>,
    /// Insertion order, kept across updates of the same id.
    sequence: u64,
}

impl Entry {
    fn order_key(&self) -> (Reverse<i32>, u64) {
        (Reverse(self.expectation.priority()), self.sequence)
    }
}

/// Expectations ordered by priority (highest first), then insertion order.
///
/// Matching takes the read lock only; each expectation's remaining count is
/// decremented atomically, so concurrent lookups never block each other.
/// Mutations take the write lock, capture a revision-stamped snapshot under
/// it, and notify listeners after it is released.
pub struct ExpectationStore {
    entries: RwLock<Vec<Entry>>,
    sequence: AtomicU64,
    revision: AtomicU64,
    max_expectations: usize,
    clock: Arc<dyn Clock>,
    listeners: RwLock<Vec<Arc<dyn ExpectationListener>>>,
}

impl ExpectationStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_MAX_EXPECTATIONS)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, max_expectations: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            sequence: AtomicU64::new(0),
            revision: AtomicU64::new(0),
            max_expectations: max_expectations.max(1),
            clock,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn ExpectationListener>) {
        self.listeners.write().push(listener);
    }

    /// Insert an expectation, replacing any stored one with the same id.
    pub fn add(&self, expectation: Expectation) -> Arc<Expectation> {
        self.add_with_cause(expectation, MutationCause::Api)
    }

    pub fn add_with_cause(&self, expectation: Expectation, cause: MutationCause) -> Arc<Expectation> {
        let expectation = Arc::new(expectation.with_created(self.clock.now()));
        let current = {
            let mut entries = self.entries.write();
            self.upsert(&mut entries, Arc::clone(&expectation));
            self.snapshot(&entries)
        };
        self.notify(&current, cause);
        expectation
    }

    /// Replace an existing expectation by id, keeping its insertion position.
    pub fn update(&self, expectation: Expectation) -> Result<Arc<Expectation>, ExpectationError> {
        let expectation = Arc::new(expectation.with_created(self.clock.now()));
        let current = {
            let mut entries = self.entries.write();
            if !entries.iter().any(|e| e.expectation.id() == expectation.id()) {
                return Err(ExpectationError::NotFound(expectation.id().to_string()));
            }
            self.upsert(&mut entries, Arc::clone(&expectation));
            self.snapshot(&entries)
        };
        self.notify(&current, MutationCause::Api);
        Ok(expectation)
    }

    /// First active expectation matching the request, consuming one of its uses.
    pub fn first_matching_expectation(&self, request: &HttpRequest) -> Option<Arc<Expectation>> {
        let now = self.clock.now();
        let entries = self.entries.read();
        entries
            .iter()
            .find(|e| e.expectation.matches_at(Some(request), now))
            .map(|e| Arc::clone(&e.expectation))
    }

    /// Match report for every active expectation, in match order.
    pub fn explain(&self, request: &HttpRequest) -> Vec<(Arc<Expectation>, MatchDifference)> {
        let now = self.clock.now();
        self.entries
            .read()
            .iter()
            .filter(|e| e.expectation.is_active_at(now))
            .map(|e| {
                let report = e.expectation.matcher().explain(Some(request));
                (Arc::clone(&e.expectation), report)
            })
            .collect()
    }

    /// Remove expectations whose own request matches `request`; all when `None`.
    pub fn clear(&self, request: Option<&HttpRequest>) -> Vec<Arc<Expectation>> {
        let removed = match request {
            None => self.remove_where(|_| true, MutationCause::Api),
            Some(request) => {
                let matcher = HttpRequestMatcher::control_plane(Some(request));
                self.remove_where(|e| matcher.matches(e.http_request()), MutationCause::Api)
            }
        };
        info!("Cleared {} expectations", removed.len());
        removed
    }

    pub fn reset(&self) {
        let removed = self.remove_where(|_| true, MutationCause::Reset);
        info!("Reset expectation store, removed {} expectations", removed.len());
    }

    /// Remove expectations whose time-to-live has elapsed.
    pub fn remove_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = self.remove_where(
            |e| !e.time_to_live().still_alive(now),
            MutationCause::Expiry,
        );
        if !removed.is_empty() {
            debug!("Removed {} expired expectations", removed.len());
        }
        removed.len()
    }

    /// Active expectations whose own request matches `request` (all when `None`).
    pub fn retrieve_active(&self, request: Option<&HttpRequest>) -> Vec<Arc<Expectation>> {
        let now = self.clock.now();
        let matcher = request.map(|r| HttpRequestMatcher::control_plane(Some(r)));
        self.entries
            .read()
            .iter()
            .map(|e| &e.expectation)
            .filter(|e| e.is_active_at(now))
            .filter(|e| matcher.as_ref().map_or(true, |m| m.matches(e.http_request())))
            .cloned()
            .collect()
    }

    /// Every stored expectation, exhausted ones included, in match order.
    pub fn all(&self) -> Vec<Arc<Expectation>> {
        expectations_of(&self.entries.read())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Expectation>> {
        self.entries
            .read()
            .iter()
            .find(|e| e.expectation.id() == id)
            .map(|e| Arc::clone(&e.expectation))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn remove_where<F>(&self, predicate: F, cause: MutationCause) -> Vec<Arc<Expectation>>
    where
        F: Fn(&Expectation) -> bool,
    {
        let (removed, remaining) = {
            let mut entries = self.entries.write();
            let (removed, kept): (Vec<Entry>, Vec<Entry>) =
                entries.drain(..).partition(|e| predicate(&e.expectation));
            *entries = kept;
            (
                removed.into_iter().map(|e| e.expectation).collect::<Vec<_>>(),
                self.snapshot(&entries),
            )
        };
        if !removed.is_empty() || cause == MutationCause::Reset {
            self.notify(&remaining, cause);
        }
        removed
    }

    /// Insert or replace by id under an already held write guard, then evict
    /// the oldest entries beyond capacity.
    fn upsert(&self, entries: &mut Vec<Entry>, expectation: Arc<Expectation>) {
        let sequence = match entries
            .iter()
            .position(|e| e.expectation.id() == expectation.id())
        {
            Some(index) => entries.remove(index).sequence,
            None => self.sequence.fetch_add(1, Ordering::SeqCst),
        };
        insert_ordered(entries, Entry { expectation, sequence });
        while entries.len() > self.max_expectations {
            if let Some(oldest) = oldest_index(entries) {
                let evicted = entries.remove(oldest);
                warn!(
                    "Maximum of {} expectations reached, evicting expectation {}",
                    self.max_expectations,
                    evicted.expectation.id()
                );
            }
        }
    }

    /// Must be called with the write guard held so revisions follow mutation order.
    fn snapshot(&self, entries: &[Entry]) -> StoreSnapshot {
        StoreSnapshot {
            revision: self.revision.fetch_add(1, Ordering::SeqCst) + 1,
            taken_at: self.clock.now(),
            expectations: expectations_of(entries),
        }
    }

    fn notify(&self, snapshot: &StoreSnapshot, cause: MutationCause) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.updated(snapshot, cause);
        }
    }
}

impl Default for ExpectationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_ordered(entries: &mut Vec<Entry>, entry: Entry) {
    let key = entry.order_key();
    let index = entries.partition_point(|e| e.order_key() <= key);
    entries.insert(index, entry);
}

fn oldest_index(entries: &[Entry]) -> Option<usize> {
    entries
        .iter()
        .enumerate()
        .min_by_key(|(_, e)| e.sequence)
        .map(|(i, _)| i)
}

fn expectations_of(entries: &[Entry]) -> Vec<Arc<Expectation>> {
    entries.iter().map(|e| Arc::clone(&e.expectation)).collect()
}
