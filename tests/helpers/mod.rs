#![allow(dead_code)]

use std::sync::Arc;

use memory_mcp::config::MemoryConfig;
use memory_mcp::db;
use memory_mcp::memory::types::{MemoryEntry, WriteInput};
use memory_mcp::memory::MemoryService;

pub const NS: &str = "acme/svc/branch";

/// Service over a fresh in-memory database with default config.
pub fn test_service() -> MemoryService {
    test_service_with(MemoryConfig::default())
}

pub fn test_service_with(config: MemoryConfig) -> MemoryService {
    let store = db::open_memory_database().unwrap();
    MemoryService::new(store, Arc::new(config)).unwrap()
}

/// Write a memory into [`NS`] with the given scope and importance.
pub fn write(svc: &MemoryService, content: &str, scope: &str, importance: i64) -> MemoryEntry {
    svc.write(WriteInput {
        namespace: NS.into(),
        content: content.into(),
        scope: Some(scope.into()),
        importance: Some(importance),
        ..Default::default()
    })
    .unwrap()
}

/// Same as [`write`] but with an explicit TTL for short memories.
pub fn write_with_ttl(svc: &MemoryService, content: &str, ttl_seconds: i64) -> MemoryEntry {
    svc.write(WriteInput {
        namespace: NS.into(),
        content: content.into(),
        ttl_seconds: Some(ttl_seconds),
        ..Default::default()
    })
    .unwrap()
}
