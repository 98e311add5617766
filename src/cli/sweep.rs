use anyhow::Result;

use memory_mcp::config::MemoryConfig;
use memory_mcp::memory::lifecycle::expire_short;

/// Run one TTL sweep and report how many short-term memories were removed.
pub fn sweep(config: &MemoryConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let store = memory_mcp::db::open_database(&db_path)?;
    let conn = store.lock()?;

    let removed = expire_short(&conn, store.fts_enabled(), chrono::Utc::now())?;
    if removed > 0 {
        println!("Removed {removed} expired short-term memories.");
    } else {
        println!("No expired short-term memories.");
    }
    Ok(())
}
