mod helpers;

use std::sync::Arc;

use helpers::{write, NS};
use memory_mcp::config::MemoryConfig;
use memory_mcp::db::Store;
use memory_mcp::error::MemoryError;
use memory_mcp::memory::search::FALLBACK_QUERY_SCORE;
use memory_mcp::memory::types::{SearchInput, SearchResult};
use memory_mcp::memory::MemoryService;
use rusqlite::Connection;

fn search(svc: &MemoryService, query: &str) -> Vec<SearchResult> {
    svc.search(SearchInput {
        namespace: NS.into(),
        query: query.into(),
        ..Default::default()
    })
    .unwrap()
}

/// A store whose `memories_fts` is a plain table, so every MATCH query fails.
fn broken_index_service() -> MemoryService {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE memories_fts (id TEXT, content TEXT, summary TEXT);")
        .unwrap();
    let store = Store::from_connection(conn).unwrap();
    MemoryService::new(store, Arc::new(MemoryConfig::default())).unwrap()
}

#[test]
fn failing_fts_query_falls_back_to_substring_search() {
    let svc = broken_index_service();
    write(&svc, "older rollout note", "long", 3);
    write(&svc, "newer rollout note", "long", 3);

    let results = search(&svc, "rollout");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.lexical_score == FALLBACK_QUERY_SCORE));
}

#[test]
fn dropped_index_never_loses_writes() {
    let svc = helpers::test_service();
    svc.store()
        .lock()
        .unwrap()
        .execute_batch("DROP TABLE memories_fts;")
        .unwrap();

    // Index mirror fails, the row is still stored and still findable.
    let entry = write(&svc, "kernel upgrade scheduled", "long", 4);
    let results = search(&svc, "kernel");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.id, entry.id);

    // Sweep cleanup of the missing index is non-fatal too.
    assert_eq!(svc.expire_short().unwrap(), 0);
}

#[test]
fn fts_zero_hits_falls_back_to_substring() {
    let svc = helpers::test_service();
    // FTS matches whole tokens only; the substring scan finds the fragment.
    write(&svc, "migrated the kubernetes cluster", "long", 3);

    let results = search(&svc, "bernet");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].lexical_score, FALLBACK_QUERY_SCORE);
}

#[test]
fn empty_query_lists_newest_first() {
    let svc = helpers::test_service();
    let first = write(&svc, "first", "long", 3);
    let second = write(&svc, "second", "long", 3);

    let results = search(&svc, "");
    let ids: Vec<_> = results.iter().map(|r| r.record.id.clone()).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[test]
fn poisoned_lock_is_reported_not_panicking() {
    let svc = helpers::test_service();
    let store = svc.store().clone();
    let _ = std::thread::spawn(move || {
        let _guard = store.lock().unwrap();
        panic!("poison the store lock");
    })
    .join();

    let err = svc.stats().unwrap_err();
    assert!(matches!(err, MemoryError::LockPoisoned));
}
