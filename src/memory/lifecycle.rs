//! TTL expiry for short-term memories and the background sweeper that runs it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::service::MemoryService;
use super::types::format_timestamp;

/// Delete short memories whose expiry is at or before `now`. Returns the number removed.
///
/// Orphaned FTS rows are cleaned up afterwards; a failure there is only logged.
pub fn expire_short(conn: &Connection, fts_enabled: bool, now: DateTime<Utc>) -> rusqlite::Result<usize> {
    let removed = conn.execute(
        "DELETE FROM memories \
         WHERE scope = 'short' AND expires_at IS NOT NULL AND expires_at <= ?1",
        params![format_timestamp(now)],
    )?;

    if removed > 0 && fts_enabled {
        if let Err(e) = conn.execute(
            "DELETE FROM memories_fts WHERE id NOT IN (SELECT id FROM memories)",
            [],
        ) {
            tracing::warn!(error = %e, "fts cleanup after expiry failed");
        }
    }

    Ok(removed)
}

/// Run [`MemoryService::expire_short`] every `interval` until `shutdown` flips to `true`.
///
/// The first sweep happens one full interval after spawn. Sweep failures are
/// logged and retried on the next tick.
pub fn spawn_sweeper(
    service: MemoryService,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::debug!(interval_secs = interval.as_secs(), "ttl sweeper started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender also means stop.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let svc = service.clone();
                    match tokio::task::spawn_blocking(move || svc.expire_short()).await {
                        Ok(Ok(0)) => {}
                        Ok(Ok(n)) => tracing::info!(count = n, "ttl sweep removed expired short memories"),
                        Ok(Err(e)) => tracing::warn!(error = %e, "ttl sweep failed"),
                        Err(e) => tracing::warn!(error = %e, "ttl sweep task panicked"),
                    }
                }
            }
        }

        tracing::debug!("ttl sweeper stopped");
    })
}
