use super::*;
use crate::model::VerificationTimes;

fn on_path(path: &str) -> HttpRequest {
    HttpRequest::request().with_path(path)
}

fn log_with(paths: &[&str]) -> EventLog {
    let log = EventLog::default();
    for path in paths {
        log.add(LogEntry::new(LogEntryType::ReceivedRequest).with_request(on_path(path)));
    }
    log
}

fn verify(log: &EventLog, path: &str, times: VerificationTimes) -> String {
    Verifier::new(log).verify(&Verification::verification(on_path(path), times))
}

#[test]
fn test_verify_success_is_empty() {
    let log = log_with(&["/a", "/b", "/a"]);
    assert_eq!(verify(&log, "/a", VerificationTimes::exactly(2)), "");
    assert_eq!(verify(&log, "/a", VerificationTimes::at_least(1)), "");
    assert_eq!(verify(&log, "/c", VerificationTimes::never()), "");
    assert_eq!(verify(&log, "/.*", VerificationTimes::between(2, 3)), "");
}

#[test]
fn test_verify_at_least_once_phrasing() {
    let log = log_with(&["/b"]);
    let failure = verify(&log, "/a", VerificationTimes::at_least(1));
    assert!(failure.starts_with("Request not found at least once expected:<"), "{}", failure);
    assert!(failure.contains("\"path\": \"/a\""));
    assert!(failure.ends_with("]>"));
}

#[test]
fn test_verify_exact_count_phrasing() {
    let log = log_with(&["/a"]);
    assert!(verify(&log, "/a", VerificationTimes::exactly(2)).starts_with("Request not found exactly 2 times"));
    assert!(verify(&log, "/b", VerificationTimes::once()).starts_with("Request not found exactly once"));
    assert!(verify(&log, "/a", VerificationTimes::at_least(2)).starts_with("Request not found at least 2 times"));
}

#[test]
fn test_verify_with_empty_log_reports_empty_array() {
    let log = EventLog::default();
    let failure = verify(&log, "/a", VerificationTimes::once());
    assert!(failure.ends_with("but was:<[]>"), "{}", failure);
}

#[test]
fn test_verify_records_outcome_in_log() {
    let log = log_with(&["/a"]);
    verify(&log, "/a", VerificationTimes::once());
    verify(&log, "/b", VerificationTimes::once());
    let types: Vec<LogEntryType> = log.retrieve_messages(None).iter().map(|e| e.entry_type).collect();
    assert_eq!(
        types,
        vec![
            LogEntryType::ReceivedRequest,
            LogEntryType::Verification,
            LogEntryType::VerificationFailed
        ]
    );
}

#[test]
fn test_sequence_allows_gaps() {
    let log = log_with(&["/a", "/x", "/b", "/y", "/c"]);
    let verifier = Verifier::new(&log);
    let ok = verifier.verify_sequence(&VerificationSequence::sequence(vec![
        on_path("/a"),
        on_path("/b"),
        on_path("/c"),
    ]));
    assert_eq!(ok, "");
}

#[test]
fn test_sequence_out_of_order_names_first_unmatched_index() {
    let log = log_with(&["/a", "/b", "/c"]);
    let failure = Verifier::new(&log).verify_sequence(&VerificationSequence::sequence(vec![
        on_path("/b"),
        on_path("/a"),
    ]));
    assert!(
        failure.starts_with("Request sequence not found, first unmatched request at index 1 expected:<"),
        "{}",
        failure
    );
}

#[test]
fn test_sequence_requires_distinct_occurrences() {
    let log = log_with(&["/a", "/b"]);
    let failure = Verifier::new(&log).verify_sequence(&VerificationSequence::sequence(vec![
        on_path("/a"),
        on_path("/a"),
    ]));
    assert!(failure.contains("at index 1"));
}

#[test]
fn test_empty_sequence_succeeds() {
    let log = EventLog::default();
    assert_eq!(Verifier::new(&log).verify_sequence(&VerificationSequence::default()), "");
}
