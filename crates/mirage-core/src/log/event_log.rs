use super::entry::{LogEntry, LogEntryType};
use crate::expectation::Expectation;
use crate::model::{HttpRequest, HttpResponse};
use crate::predicate::HttpRequestMatcher;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

pub const DEFAULT_MAX_LOG_ENTRIES: usize = 60_000;

/// A logged request together with the response returned for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAndResponse {
    pub http_request: HttpRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_response: Option<HttpResponse>,
}

/// Bounded event log; the oldest entries are dropped once full.
pub struct EventLog {
    entries: RwLock<VecDeque<LogEntry>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn add(&self, entry: LogEntry) {
        let mut entries = self.entries.write();
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Remove entries with a request matching `request`; everything when `None`.
    pub fn clear(&self, request: Option<&HttpRequest>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        match request {
            None => entries.clear(),
            Some(request) => {
                let matcher = HttpRequestMatcher::new(Some(request));
                entries.retain(|e| !matches_any(&matcher, e));
            }
        }
        let removed = before - entries.len();
        debug!("Cleared {} log entries", removed);
        removed
    }

    pub fn reset(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Received requests matching `request`, oldest first.
    pub fn retrieve_requests(&self, request: Option<&HttpRequest>) -> Vec<HttpRequest> {
        self.filtered(request, |e| e.entry_type == LogEntryType::ReceivedRequest)
            .into_iter()
            .flat_map(|e| e.http_requests.into_iter().take(1))
            .collect()
    }

    pub fn retrieve_request_responses(&self, request: Option<&HttpRequest>) -> Vec<RequestAndResponse> {
        self.filtered(request, |e| e.entry_type.has_response())
            .into_iter()
            .filter_map(|e| {
                let LogEntry {
                    mut http_requests,
                    http_response,
                    ..
                } = e;
                if http_requests.is_empty() {
                    return None;
                }
                Some(RequestAndResponse {
                    http_request: http_requests.swap_remove(0),
                    http_response,
                })
            })
            .collect()
    }

    /// Forwarded exchanges replayed as expectations that return the recorded response.
    pub fn retrieve_recorded_expectations(&self, request: Option<&HttpRequest>) -> Vec<Expectation> {
        self.filtered(request, |e| e.entry_type == LogEntryType::ForwardedRequest)
            .into_iter()
            .filter_map(|e| {
                let recorded = e.first_request()?.clone();
                Expectation::new(Some(recorded))
                    .then_respond(e.http_response)
                    .ok()
            })
            .collect()
    }

    /// Every entry whose request matches `request`. With `None`, entries without
    /// a request are included too.
    pub fn retrieve_messages(&self, request: Option<&HttpRequest>) -> Vec<LogEntry> {
        self.filtered(request, |_| true)
    }

    fn filtered<F>(&self, request: Option<&HttpRequest>, keep: F) -> Vec<LogEntry>
    where
        F: Fn(&LogEntry) -> bool,
    {
        let matcher = request.map(|r| HttpRequestMatcher::new(Some(r)));
        self.entries
            .read()
            .iter()
            .filter(|e| keep(e))
            .filter(|e| matcher.as_ref().map_or(true, |m| matches_any(m, e)))
            .cloned()
            .collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_ENTRIES)
    }
}

fn matches_any(matcher: &HttpRequestMatcher, entry: &LogEntry) -> bool {
    entry.http_requests.iter().any(|r| matcher.matches(Some(r)))
}
