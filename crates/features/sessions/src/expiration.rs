//! Background expiration/passivation sweeps.

use crate::manager::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Spawns the periodic sweep task for one manager.
///
/// The task runs until aborted; the first tick fires after one full interval.
pub fn spawn_sweeper(manager: Arc<SessionManager>) -> JoinHandle<()> {
    let interval = Duration::from_secs(manager.config().sweep_interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so a sweep never
        // races manager initialization.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            trace!(manager = %manager.name(), "Running expiration sweep");
            manager.process_expiration().await;
        }
    })
}
