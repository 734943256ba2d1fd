// Expectation matching, storage and verification engine for an HTTP mock server.
// The transport layer decodes requests, asks `MockState` for the matching
// expectation and executes its action.

// ===== Data model and matchers =====
pub mod model;
pub mod predicate;

// ===== Expectations, event log and verification =====
pub mod expectation;
pub mod log;
pub mod state;
pub mod verify;

// ===== Ambient: clock, configuration, logging, persistence =====
pub mod clock;
pub mod config;
pub mod logging;
pub mod persistence;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use expectation::{Expectation, ExpectationError, ExpectationStore};
pub use model::{HttpRequest, HttpResponse, NottableString, Times, Verification, VerificationTimes};
pub use predicate::{HttpRequestMatcher, MatchDifference};
pub use state::{MockState, StateError};
