//! Background removal of expectations whose time-to-live has elapsed.

use super::store::ExpectationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Spawn a task that sweeps expired expectations every `interval` until
/// `shutdown` fires.
///
/// The sweep only removes entries, so a request racing it may still match an
/// expectation that has just expired.
pub fn spawn_expiry_sweeper(
    store: Arc<ExpectationStore>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.remove_expired();
                    if removed > 0 {
                        debug!("Expiry sweep removed {} expectations", removed);
                    }
                }
                _ = shutdown.recv() => {
                    info!("Expectation expiry sweeper shutting down");
                    break;
                }
            }
        }
    })
}
