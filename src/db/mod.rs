pub mod request_log;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::MemoryError;

/// Shared handle to the single SQLite connection.
///
/// All access goes through one mutex, so writes from the request path and the
/// background sweeper are serialized. `fts_enabled` is decided once at open time
/// and never re-probed.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    fts_enabled: bool,
}

impl Store {
    /// Wrap an already-open connection, initializing the schema on it.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        schema::init_schema(&conn).context("failed to initialize schema")?;
        let fts_enabled = schema::init_fts(&conn);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            fts_enabled,
        })
    }

    /// Whether the `memories_fts` full-text index is available.
    pub fn fts_enabled(&self) -> bool {
        self.fts_enabled
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>, MemoryError> {
        self.conn.lock().map_err(|_| MemoryError::LockPoisoned)
    }
}

/// Open (or create) the memory database at the given path with schema initialized.
pub fn open_database(path: impl AsRef<Path>) -> Result<Store> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    let store = Store::from_connection(conn)?;
    tracing::info!(
        path = %path.display(),
        fts = store.fts_enabled(),
        "database initialized"
    );
    Ok(store)
}

/// Open an in-memory database, mainly for tests.
pub fn open_memory_database() -> Result<Store> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    Store::from_connection(conn)
}
