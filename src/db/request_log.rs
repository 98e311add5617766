//! Append-only log of handled protocol requests, read back by the admin view.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::memory::types::{format_timestamp, parse_timestamp};

/// One handled request, as recorded by the dispatcher.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEvent {
    /// Row id; `0` until persisted.
    pub id: i64,
    pub method: String,
    /// Tool name for `tools/call`, empty otherwise.
    pub tool_name: String,
    pub success: bool,
    pub error_text: String,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

pub fn insert_request_event(conn: &Connection, event: &RequestEvent) -> rusqlite::Result<()> {
    let method = match event.method.trim() {
        "" => "unknown",
        m => m,
    };
    conn.execute(
        "INSERT INTO mcp_requests (method, tool_name, success, error_text, duration_ms, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            method,
            event.tool_name.trim(),
            event.success,
            event.error_text.trim(),
            event.duration_ms,
            format_timestamp(event.created_at),
        ],
    )?;
    Ok(())
}

/// Most recent request events, newest first. `limit <= 0` means 20.
pub fn recent_request_events(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<RequestEvent>> {
    let limit = if limit <= 0 { 20 } else { limit };
    let mut stmt = conn.prepare(
        "SELECT id, method, tool_name, success, error_text, duration_ms, created_at \
         FROM mcp_requests ORDER BY created_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            let created_at: String = row.get(6)?;
            Ok(RequestEvent {
                id: row.get(0)?,
                method: row.get(1)?,
                tool_name: row.get(2)?,
                success: row.get(3)?,
                error_text: row.get(4)?,
                duration_ms: row.get(5)?,
                created_at: parse_timestamp(&created_at).unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
