//! Verification of received requests against expected counts and orderings.
//!
//! Both checks read the `RECEIVED_REQUEST` entries of the event log and
//! return an empty string on success or a human-readable failure message.
//! The message wording is relied upon by client libraries.

use crate::log::{EventLog, LogEntry, LogEntryType};
use crate::model::{HttpRequest, Verification, VerificationSequence};
use crate::predicate::HttpRequestMatcher;
use serde::Serialize;
use tracing::{debug, info};

/// Runs verifications against an event log, recording each outcome in it.
pub struct Verifier<'a> {
    log: &'a EventLog,
}

impl<'a> Verifier<'a> {
    pub fn new(log: &'a EventLog) -> Self {
        Self { log }
    }

    /// Count matching requests and compare against the expected times.
    pub fn verify(&self, verification: &Verification) -> String {
        let received = self.log.retrieve_requests(None);
        let matcher = HttpRequestMatcher::new(Some(&verification.http_request));
        let count = received.iter().filter(|r| matcher.matches(Some(r))).count();

        if verification.times.matches(count) {
            debug!("Verified request seen {} ({} matches)", verification.times, count);
            self.record(LogEntryType::Verification, &verification.http_request, String::new());
            return String::new();
        }

        let failure = format!(
            "Request not found {} expected:<{}> but was:<{}>",
            verification.times,
            to_json(&verification.http_request),
            to_json(&received)
        );
        info!("{}", failure);
        self.record(
            LogEntryType::VerificationFailed,
            &verification.http_request,
            failure.clone(),
        );
        failure
    }

    /// Check that the requests were received in order, gaps allowed.
    pub fn verify_sequence(&self, sequence: &VerificationSequence) -> String {
        let received = self.log.retrieve_requests(None);
        let mut position = 0;

        for (index, expected) in sequence.http_requests.iter().enumerate() {
            let matcher = HttpRequestMatcher::new(Some(expected));
            match received[position..].iter().position(|r| matcher.matches(Some(r))) {
                Some(offset) => position += offset + 1,
                None => {
                    let failure = format!(
                        "Request sequence not found, first unmatched request at index {} expected:<{}> but was:<{}>",
                        index,
                        to_json(&sequence.http_requests),
                        to_json(&received)
                    );
                    info!("{}", failure);
                    self.log.add(
                        LogEntry::new(LogEntryType::VerificationFailed)
                            .with_requests(sequence.http_requests.iter().cloned())
                            .with_message(failure.clone()),
                    );
                    return failure;
                }
            }
        }

        self.log.add(
            LogEntry::new(LogEntryType::Verification)
                .with_requests(sequence.http_requests.iter().cloned())
                .with_message(format!(
                    "verified sequence of {} requests",
                    sequence.http_requests.len()
                )),
        );
        String::new()
    }

    fn record(&self, entry_type: LogEntryType, request: &HttpRequest, message: String) {
        let message = if message.is_empty() {
            format!("verified request {}", to_json(request))
        } else {
            message
        };
        self.log.add(
            LogEntry::new(entry_type)
                .with_request(request.clone())
                .with_message(message),
        );
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests;
