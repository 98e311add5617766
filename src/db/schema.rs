//! SQL DDL for the memory store.
//!
//! Defines the `memories` and `mcp_requests` tables plus the optional
//! `memories_fts` (FTS5) index. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

/// Core tables. Failure to create any of these is fatal.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    namespace TEXT NOT NULL,
    scope TEXT NOT NULL CHECK(scope IN ('short','long')),
    content TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    importance INTEGER NOT NULL DEFAULT 3 CHECK(importance >= 1 AND importance <= 5),
    source_agent TEXT,
    metadata TEXT,
    created_at TEXT NOT NULL,
    last_accessed_at TEXT NOT NULL,
    expires_at TEXT,
    promoted_at TEXT,
    CHECK((scope = 'short') = (expires_at IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_memories_namespace_scope ON memories(namespace, scope);
CREATE INDEX IF NOT EXISTS idx_memories_expires_at ON memories(expires_at);
CREATE INDEX IF NOT EXISTS idx_memories_created_at ON memories(created_at);

-- Request observability log (append-only)
CREATE TABLE IF NOT EXISTS mcp_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    method TEXT NOT NULL,
    tool_name TEXT NOT NULL DEFAULT '',
    success INTEGER NOT NULL,
    error_text TEXT NOT NULL DEFAULT '',
    duration_ms INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_mcp_requests_created_at ON mcp_requests(created_at);
"#;

/// Full-text index over content + summary, keyed by memory id.
const FTS_TABLE_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    id UNINDEXED,
    content,
    summary
);
"#;

/// Initialize the core tables. Idempotent.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

/// Try to create the FTS5 index. Returns whether it is usable.
///
/// A failure here is not fatal: the store runs in degraded mode and search
/// falls back to substring matching.
pub fn init_fts(conn: &Connection) -> bool {
    if let Err(e) = conn.execute_batch(FTS_TABLE_SQL) {
        tracing::warn!(error = %e, "FTS5 disabled; falling back to substring search");
        return false;
    }
    has_fts_table(conn)
}

fn has_fts_table(conn: &Connection) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'memories_fts'",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n > 0)
    .unwrap_or(false)
}
