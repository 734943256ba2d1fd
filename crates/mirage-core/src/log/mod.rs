//! In-memory event log of received requests, matches and management actions.
//!
//! - `entry` - `LogEntry` and its type and level enums
//! - `event_log` - bounded, thread-safe `EventLog` with request-filtered retrieval

mod entry;
mod event_log;

pub use entry::{LogEntry, LogEntryType, LogLevel};
pub use event_log::{EventLog, RequestAndResponse, DEFAULT_MAX_LOG_ENTRIES};
