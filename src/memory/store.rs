//! Write path and point lookups for the `memories` table.
//!
//! [`insert_memory`] writes the primary row and mirrors content into the FTS5
//! index. Index maintenance failures are logged and never fail the write.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::memory::types::{format_timestamp, parse_timestamp, MemoryEntry, Scope};

/// Column list shared by every query that hydrates a [`MemoryEntry`].
pub(crate) const MEMORY_COLUMNS: &str = "id, namespace, scope, content, summary, importance, \
     source_agent, metadata, created_at, last_accessed_at, expires_at, promoted_at";

/// Same columns, qualified with the `m.` alias for joins.
pub(crate) const MEMORY_COLUMNS_M: &str = "m.id, m.namespace, m.scope, m.content, m.summary, \
     m.importance, m.source_agent, m.metadata, m.created_at, m.last_accessed_at, m.expires_at, \
     m.promoted_at";

/// Outcome of a promotion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoteOutcome {
    Promoted,
    NotFound,
    AlreadyLong,
}

/// Insert a new memory row, then mirror it into `memories_fts` when enabled.
pub fn insert_memory(
    conn: &Connection,
    fts_enabled: bool,
    entry: &MemoryEntry,
) -> rusqlite::Result<()> {
    let metadata_json = entry
        .metadata
        .as_ref()
        .map(|m| serde_json::Value::Object(m.clone()).to_string());

    conn.execute(
        "INSERT INTO memories (id, namespace, scope, content, summary, importance, source_agent, \
         metadata, created_at, last_accessed_at, expires_at, promoted_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            entry.id,
            entry.namespace,
            entry.scope.as_str(),
            entry.content,
            entry.summary,
            entry.importance,
            entry.source_agent,
            metadata_json,
            format_timestamp(entry.created_at),
            format_timestamp(entry.last_accessed_at),
            entry.expires_at.map(format_timestamp),
            entry.promoted_at.map(format_timestamp),
        ],
    )?;

    if fts_enabled {
        if let Err(e) = conn.execute(
            "INSERT INTO memories_fts (id, content, summary) VALUES (?1, ?2, ?3)",
            params![entry.id, entry.content, entry.summary],
        ) {
            tracing::warn!(id = %entry.id, error = %e, "fts insert failed; continuing");
        }
    }

    Ok(())
}

pub fn get_memory(conn: &Connection, id: &str) -> rusqlite::Result<Option<MemoryEntry>> {
    conn.query_row(
        &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
        params![id],
        memory_from_row,
    )
    .optional()
}

/// Move a short memory to long scope, clearing its expiry.
///
/// Only short rows are touched, so `promoted_at` is written at most once.
pub fn promote_memory(
    conn: &Connection,
    id: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<PromoteOutcome> {
    let now = format_timestamp(now);
    let rows = conn.execute(
        "UPDATE memories SET scope = 'long', expires_at = NULL, promoted_at = ?1, last_accessed_at = ?1 \
         WHERE id = ?2 AND scope = 'short'",
        params![now, id],
    )?;
    if rows > 0 {
        return Ok(PromoteOutcome::Promoted);
    }

    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM memories WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(if exists {
        PromoteOutcome::AlreadyLong
    } else {
        PromoteOutcome::NotFound
    })
}

/// Hydrate a [`MemoryEntry`] from a row selected with [`MEMORY_COLUMNS`].
pub(crate) fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryEntry> {
    let scope: String = row.get(2)?;
    let scope = scope
        .parse::<Scope>()
        .map_err(|e| conversion_error(2, e))?;
    let metadata: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;
    let last_accessed_at: String = row.get(9)?;
    let expires_at: Option<String> = row.get(10)?;
    let promoted_at: Option<String> = row.get(11)?;

    Ok(MemoryEntry {
        id: row.get(0)?,
        namespace: row.get(1)?,
        scope,
        content: row.get(3)?,
        summary: row.get(4)?,
        importance: row.get(5)?,
        source_agent: row.get(6)?,
        metadata: metadata
            .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
            .and_then(|v| match v {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            }),
        created_at: required_timestamp(8, &created_at)?,
        last_accessed_at: required_timestamp(9, &last_accessed_at)?,
        expires_at: expires_at.as_deref().and_then(parse_timestamp),
        promoted_at: promoted_at.as_deref().and_then(parse_timestamp),
    })
}

fn required_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    parse_timestamp(raw).ok_or_else(|| conversion_error(idx, format!("bad timestamp {raw:?}")))
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        message.into(),
    )
}
