//! Background sweep that deletes empty rooms.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::RoomManager;

/// Spawns a task that calls [`RoomManager::sweep`] every `period` until
/// `shutdown` flips to `true` or its sender is dropped.
///
/// The first sweep happens one full period after spawning, so a room that
/// empties survives for at most two periods and at least zero.
pub fn spawn_reaper(
    manager: Arc<RoomManager>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // `interval` fires immediately; skip that tick.
        ticker.tick().await;

        tracing::debug!(period_ms = period.as_millis() as u64, "reaper started");

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    let reaped = manager.sweep().await;
                    if !reaped.is_empty() {
                        tracing::info!(count = reaped.len(), "swept empty rooms");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("reaper stopped");
    })
}
