//! Fixed-interval background refresh.
//!
//! Two pollers run for the life of the process: the stats poller every
//! 30 seconds and the system-status poller every 60 seconds. They are
//! spawned once at startup and never cancelled or rescheduled; each
//! tick goes through the same dispatch path as a keystroke, so a slow
//! response simply overlaps the next tick and the last one to resolve
//! wins.

use crate::shared::dispatch::{Action, Dispatcher};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub const STATS_INTERVAL: Duration = Duration::from_secs(30);
pub const SYSTEM_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn both pollers. The first tick of each fires immediately, so
/// the dashboard populates without waiting a full interval.
pub fn spawn_pollers(dispatcher: Dispatcher) -> Vec<JoinHandle<()>> {
    vec![
        spawn_poller(dispatcher.clone(), Action::RefreshStats, STATS_INTERVAL),
        spawn_poller(dispatcher, Action::CheckSystemStatus, SYSTEM_INTERVAL),
    ]
}

fn spawn_poller(dispatcher: Dispatcher, action: Action, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            debug!(action = action.label(), "poll tick");
            dispatcher.trigger(action).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_intervals() {
        assert_eq!(STATS_INTERVAL, Duration::from_secs(30));
        assert_eq!(SYSTEM_INTERVAL, Duration::from_secs(60));
    }
}
