//! Background TTL sweeping driven by a manual clock.

use chrono::Duration;
use mirage_core::config::Config;
use mirage_core::model::{HttpRequest, TimeToLive, TimeUnit};
use mirage_core::{Expectation, ManualClock, MockState};
use std::sync::Arc;
use tokio::sync::broadcast;

#[tokio::test]
async fn test_sweeper_removes_expired_expectations() {
    let clock = Arc::new(ManualClock::default());
    let config = Config::from_yaml("store:\n  expirySweepIntervalMs: 10\n").unwrap();
    let state = MockState::with_clock(clock.clone(), &config);

    state.add(Expectation::with_times(
        Some(HttpRequest::request().with_path("/short")),
        None,
        Some(TimeToLive::exactly(TimeUnit::Seconds, 30)),
    ));
    state.add(Expectation::new(Some(HttpRequest::request().with_path("/long"))));

    let (shutdown, rx) = broadcast::channel(1);
    let sweeper = state.start_expiry_sweeper(rx);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(state.store().len(), 2);

    clock.advance(Duration::seconds(31));
    for _ in 0..100 {
        if state.store().len() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(state.store().len(), 1);
    assert!(state
        .store()
        .first_matching_expectation(&HttpRequest::request().with_path("/short"))
        .is_none());

    shutdown.send(()).unwrap();
    sweeper.await.unwrap();
}
