//! Aggregate counts and recent-activity views for the admin reader.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use super::types::{format_timestamp, parse_timestamp, Scope};

/// Store-wide counts. `expired` counts short rows past their expiry that the
/// sweeper has not removed yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: u64,
    pub short: u64,
    pub long: u64,
    pub expired: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentMemory {
    pub id: String,
    pub namespace: String,
    pub scope: Scope,
    /// Summary, or content when the summary is blank.
    pub summary: String,
    pub importance: i64,
    pub created_at: DateTime<Utc>,
}

pub fn stats(conn: &Connection, now: DateTime<Utc>) -> rusqlite::Result<Stats> {
    let (total, short, long, expired): (i64, i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*), \
                COALESCE(SUM(scope = 'short'), 0), \
                COALESCE(SUM(scope = 'long'), 0), \
                COALESCE(SUM(expires_at IS NOT NULL AND expires_at <= ?1), 0) \
         FROM memories",
        params![format_timestamp(now)],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;

    Ok(Stats {
        total: total as u64,
        short: short as u64,
        long: long as u64,
        expired: expired as u64,
    })
}

/// Newest memories first across all namespaces. `limit <= 0` means 20.
pub fn recent_memories(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<RecentMemory>> {
    let limit = if limit <= 0 { 20 } else { limit };
    let mut stmt = conn.prepare(
        "SELECT id, namespace, scope, summary, content, importance, created_at \
         FROM memories ORDER BY created_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            let scope: String = row.get(2)?;
            let summary: String = row.get(3)?;
            let content: String = row.get(4)?;
            let created_at: String = row.get(6)?;
            Ok(RecentMemory {
                id: row.get(0)?,
                namespace: row.get(1)?,
                scope: scope.parse().unwrap_or(Scope::Short),
                summary: if summary.trim().is_empty() { content } else { summary },
                importance: row.get(5)?,
                created_at: parse_timestamp(&created_at).unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
