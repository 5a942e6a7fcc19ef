// src/sync/scheduler.rs
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::sync::{SyncOrchestrator, SyncOutcome};

/// Spawn a periodic trigger for `sync_all`. The first tick fires immediately.
/// Failed or rejected runs are logged; the loop keeps going.
pub fn spawn_sync_scheduler(orch: Arc<SyncOrchestrator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            counter!("sync_scheduler_ticks_total").increment(1);

            match orch.sync_all().await {
                Ok(SyncOutcome::Completed(t)) => tracing::info!(
                    target: "sync",
                    added = t.added,
                    processed = t.processed,
                    sources = t.sources,
                    "scheduled sync tick"
                ),
                Ok(SyncOutcome::AlreadyRunning) => {
                    tracing::debug!(target: "sync", "scheduled tick skipped, run in flight")
                }
                Err(e) => tracing::warn!(target: "sync", "scheduled sync failed: {e:#}"),
            }
        }
    })
}
