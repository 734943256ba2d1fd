//! Management facade combining the expectation store, the event log and
//! verification, as used by a transport or management API layer.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::expectation::{
    spawn_expiry_sweeper, ClearType, Expectation, ExpectationError, ExpectationStore, Format,
    InvalidParameter, MutationCause, RetrieveType,
};
use crate::log::{EventLog, LogEntry, LogEntryType, LogLevel};
use crate::model::{HttpRequest, HttpResponse, Verification, VerificationSequence};
use crate::persistence::{load_initialization_file, ExpectationFileSystemPersistence};
use crate::predicate::{body, MatchDifference, MatchField};
use crate::verify::Verifier;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const LOG_SEPARATOR: &str = "------------------------------------";

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameter),
    #[error(transparent)]
    Expectation(#[from] ExpectationError),
    #[error("failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct MockState {
    store: Arc<ExpectationStore>,
    log: EventLog,
    clock: Arc<dyn Clock>,
    detailed_match_failures: bool,
    sweep_interval: Duration,
}

impl MockState {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), &Config::default())
    }

    pub fn with_clock(clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            store: Arc::new(ExpectationStore::with_clock(
                Arc::clone(&clock),
                config.store.max_expectations,
            )),
            log: EventLog::new(config.log.max_log_entries),
            clock,
            detailed_match_failures: config.matching.detailed_match_failures,
            sweep_interval: config.expiry_sweep_interval(),
        }
    }

    /// Build from configuration: attaches file persistence when enabled and
    /// loads the initialization file when one is configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let state = Self::with_clock(Arc::new(SystemClock), config);
        if config.persistence.persist_expectations {
            state.store.add_listener(Arc::new(ExpectationFileSystemPersistence::new(
                config.persistence.persisted_expectations_path.clone(),
            )));
        }
        if let Some(path) = &config.persistence.initialization_json_path {
            for expectation in load_initialization_file(path)? {
                state.add_with_cause(expectation, MutationCause::Initializer);
            }
        }
        Ok(state)
    }

    pub fn store(&self) -> &Arc<ExpectationStore> {
        &self.store
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Start the background TTL sweep at the configured interval.
    pub fn start_expiry_sweeper(&self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        spawn_expiry_sweeper(Arc::clone(&self.store), self.sweep_interval, shutdown)
    }

    // ------------------------------------------------------------------------
    // Expectations
    // ------------------------------------------------------------------------

    pub fn add(&self, expectation: Expectation) -> Arc<Expectation> {
        self.add_with_cause(expectation, MutationCause::Api)
    }

    fn add_with_cause(&self, expectation: Expectation, cause: MutationCause) -> Arc<Expectation> {
        let added = self.store.add_with_cause(expectation, cause);
        info!("creating expectation {} ({})", added.id(), cause);
        self.record_created(&added);
        added
    }

    pub fn update(&self, expectation: Expectation) -> Result<Arc<Expectation>, StateError> {
        let updated = self.store.update(expectation)?;
        info!("updating expectation {}", updated.id());
        self.record_created(&updated);
        Ok(updated)
    }

    fn record_created(&self, expectation: &Expectation) {
        let mut entry = self
            .entry(LogEntryType::CreatedExpectation)
            .with_expectation_id(expectation.id())
            .with_message(format!("creating expectation:{}", to_json(expectation)));
        if let Some(request) = expectation.http_request() {
            entry = entry.with_request(request.clone());
        }
        self.log.add(entry);
    }

    /// Find the action for an incoming request and record it as received.
    ///
    /// Consumes one use of the returned expectation. When nothing matches a
    /// `NO_MATCH_RESPONSE` entry is recorded, explaining why each active
    /// expectation was rejected unless detailed reports are disabled.
    pub fn first_matching_expectation(&self, request: &HttpRequest) -> Option<Arc<Expectation>> {
        self.log.add(
            self.entry(LogEntryType::ReceivedRequest)
                .with_request(request.clone())
                .with_message(format!("received request:{}", to_json(request))),
        );

        if let Some(expectation) = self.store.first_matching_expectation(request) {
            debug!("Request matched expectation {}", expectation.id());
            self.log.add(
                self.entry(LogEntryType::ExpectationMatched)
                    .with_request(request.clone())
                    .with_expectation_id(expectation.id())
                    .with_message(format!(
                        "request:{} matched expectation:{}",
                        to_json(request),
                        to_json(expectation.as_ref())
                    )),
            );
            return Some(expectation);
        }

        let mut message = format!("no expectation for:{}", to_json(request));
        if self.detailed_match_failures {
            for (expectation, report) in self.store.explain(request) {
                self.record_body_failures(request, &expectation, &report);
                message.push_str(&format!(
                    "\n\n didn't match expectation {} because:\n{}",
                    expectation.id(),
                    report
                ));
            }
        }
        debug!("No expectation matched {} {}", request.method, request.path);
        self.log.add(
            self.entry(LogEntryType::NoMatchResponse)
                .with_request(request.clone())
                .with_response(HttpResponse::not_found())
                .with_message(message),
        );
        None
    }

    fn record_body_failures(&self, request: &HttpRequest, expectation: &Expectation, report: &MatchDifference) {
        let Some(result) = report.field(MatchField::Body) else {
            return;
        };
        for failure in result.differences.iter().filter(|d| body::is_failure(d)) {
            self.log.add(
                self.entry(LogEntryType::Exception)
                    .with_level(LogLevel::Warn)
                    .with_request(request.clone())
                    .with_expectation_id(expectation.id())
                    .with_message(failure.clone()),
            );
        }
    }

    /// Field-by-field match report against every active expectation.
    pub fn explain(&self, request: &HttpRequest) -> Vec<(Arc<Expectation>, MatchDifference)> {
        self.store.explain(request)
    }

    // ------------------------------------------------------------------------
    // Clearing
    // ------------------------------------------------------------------------

    pub fn clear(&self, request: Option<&HttpRequest>, clear_type: ClearType) {
        let (expectations, entries) = match clear_type {
            ClearType::Log => (0, self.log.clear(request)),
            ClearType::Expectations => (self.store.clear(request).len(), 0),
            ClearType::All => (self.store.clear(request).len(), self.log.clear(request)),
        };
        let scope = match clear_type {
            ClearType::Log => "logs",
            ClearType::Expectations => "expectations",
            ClearType::All => "logs and expectations",
        };
        let target = request.map_or_else(|| "all requests".to_string(), |r| to_json(r));
        info!(
            "clearing {} that match {} ({} expectations, {} log entries)",
            scope, target, expectations, entries
        );
        let mut entry = self
            .entry(LogEntryType::Cleared)
            .with_message(format!("clearing {} that match:{}", scope, target));
        if let Some(request) = request {
            entry = entry.with_request(request.clone());
        }
        self.log.add(entry);
    }

    /// Clear with a type given by name; `None` clears everything.
    pub fn clear_by_name(&self, request: Option<&HttpRequest>, clear_type: Option<&str>) -> Result<(), StateError> {
        let clear_type = clear_type.map(str::parse::<ClearType>).transpose()?.unwrap_or_default();
        self.clear(request, clear_type);
        Ok(())
    }

    /// Remove every expectation and log entry.
    pub fn reset(&self) {
        self.store.reset();
        self.log.reset();
        info!("resetting all expectations and request logs");
    }

    // ------------------------------------------------------------------------
    // Retrieval
    // ------------------------------------------------------------------------

    pub fn retrieve(
        &self,
        request: Option<&HttpRequest>,
        retrieve_type: RetrieveType,
        format: Format,
    ) -> Result<String, StateError> {
        let (output, count) = match (retrieve_type, format) {
            (RetrieveType::Logs, Format::LogEntries) => {
                let entries = self.log.retrieve_messages(request);
                let text = entries
                    .iter()
                    .map(LogEntry::describe)
                    .collect::<Vec<_>>()
                    .join(&format!("\n{}\n", LOG_SEPARATOR));
                (text, entries.len())
            }
            (RetrieveType::Logs, Format::Json) => pretty(&self.log.retrieve_messages(request))?,
            (RetrieveType::Requests, Format::Json) => pretty(&self.log.retrieve_requests(request))?,
            (RetrieveType::RequestResponses, Format::Json) => {
                pretty(&self.log.retrieve_request_responses(request))?
            }
            (RetrieveType::RecordedExpectations, Format::Json) => {
                pretty(&self.log.retrieve_recorded_expectations(request))?
            }
            (RetrieveType::ActiveExpectations, Format::Json) => {
                let active = self.store.retrieve_active(request);
                pretty(&active.iter().map(|e| e.as_ref()).collect::<Vec<_>>())?
            }
            (retrieve_type, Format::LogEntries) => {
                let entries: Vec<LogEntry> = self
                    .log
                    .retrieve_messages(request)
                    .into_iter()
                    .filter(|e| self.selects(retrieve_type, e))
                    .collect();
                pretty(&entries)?
            }
        };

        let mut entry = self.entry(LogEntryType::Retrieved).with_message(format!(
            "retrieved {} {} in {} format",
            count,
            retrieve_type.as_str(),
            format.as_str()
        ));
        if let Some(request) = request {
            entry = entry.with_request(request.clone());
        }
        self.log.add(entry);
        Ok(output)
    }

    /// Retrieve with type and format given by name; `None` selects the default.
    pub fn retrieve_by_name(
        &self,
        request: Option<&HttpRequest>,
        retrieve_type: Option<&str>,
        format: Option<&str>,
    ) -> Result<String, StateError> {
        let retrieve_type = retrieve_type
            .map(str::parse::<RetrieveType>)
            .transpose()?
            .unwrap_or_default();
        let format = format.map(str::parse::<Format>).transpose()?.unwrap_or_default();
        self.retrieve(request, retrieve_type, format)
    }

    fn selects(&self, retrieve_type: RetrieveType, entry: &LogEntry) -> bool {
        match retrieve_type {
            RetrieveType::Logs => true,
            RetrieveType::Requests => entry.entry_type == LogEntryType::ReceivedRequest,
            RetrieveType::RequestResponses => entry.entry_type.has_response(),
            RetrieveType::RecordedExpectations => entry.entry_type == LogEntryType::ForwardedRequest,
            RetrieveType::ActiveExpectations => {
                entry.entry_type == LogEntryType::CreatedExpectation
                    && entry
                        .expectation_id
                        .as_deref()
                        .and_then(|id| self.store.get(id))
                        .is_some_and(|e| e.is_active_at(self.clock.now()))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Event log and verification
    // ------------------------------------------------------------------------

    /// Append an entry recorded by the caller, e.g. the response sent for a request.
    pub fn log(&self, entry: LogEntry) {
        if entry.entry_type == LogEntryType::Exception {
            warn!("{}", entry.message);
        }
        self.log.add(entry);
    }

    pub fn verify(&self, verification: &Verification) -> String {
        Verifier::new(&self.log).verify(verification)
    }

    pub fn verify_sequence(&self, sequence: &VerificationSequence) -> String {
        Verifier::new(&self.log).verify_sequence(sequence)
    }

    fn entry(&self, entry_type: LogEntryType) -> LogEntry {
        LogEntry::new(entry_type).with_timestamp(self.clock.now())
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn pretty<T: Serialize>(items: &[T]) -> Result<(String, usize), serde_json::Error> {
    Ok((serde_json::to_string_pretty(items)?, items.len()))
}
