use anyhow::Result;

use memory_mcp::config::MemoryConfig;
use memory_mcp::db::request_log::recent_request_events;
use memory_mcp::memory::stats::{recent_memories, stats as memory_stats};
use memory_mcp::memory::types::truncate_chars;

/// Print aggregate counts, recent requests and recent memories.
pub fn stats(config: &MemoryConfig, limit: i64) -> Result<()> {
    let db_path = config.resolved_db_path();
    let store = memory_mcp::db::open_database(&db_path)?;
    let conn = store.lock()?;

    let counts = memory_stats(&conn, chrono::Utc::now())?;
    let events = recent_request_events(&conn, limit)?;
    let memories = recent_memories(&conn, limit)?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", counts.total);
    println!("  Short-term:          {}", counts.short);
    println!("  Long-term:           {}", counts.long);
    println!("  Expired (unswept):   {}", counts.expired);
    println!("  FTS5 index:          {}", if store.fts_enabled() { "enabled" } else { "disabled" });
    println!();

    println!("Recent Requests");
    if events.is_empty() {
        println!("  (none)");
    }
    for e in &events {
        let status = if e.success { "ok " } else { "ERR" };
        let target = if e.tool_name.is_empty() {
            e.method.clone()
        } else {
            format!("{} {}", e.method, e.tool_name)
        };
        println!(
            "  {} {} {:<36} {:>5}ms {}",
            e.created_at.format("%Y-%m-%d %H:%M:%S"),
            status,
            target,
            e.duration_ms,
            truncate_chars(&e.error_text, 60),
        );
    }
    println!();

    println!("Recent Memories");
    if memories.is_empty() {
        println!("  (none)");
    }
    for m in &memories {
        println!(
            "  {} [{:<5}] imp={} {} {}",
            m.created_at.format("%Y-%m-%d %H:%M:%S"),
            m.scope,
            m.importance,
            m.namespace,
            truncate_chars(&m.summary, 80),
        );
    }

    Ok(())
}
