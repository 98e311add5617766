//! Hybrid lexical candidate retrieval.
//!
//! The FTS5 path ranks by BM25 and is preferred whenever the query has tokens and
//! the index exists. Anything else (no tokens, no index, zero FTS hits, FTS
//! error) falls back to a substring scan ordered by recency.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::error::Result;
use crate::memory::store::{memory_from_row, MEMORY_COLUMNS, MEMORY_COLUMNS_M};
use crate::memory::types::{format_timestamp, MemoryEntry, Scope};

/// Lexical score assigned to substring-fallback hits for a non-empty query.
pub const FALLBACK_QUERY_SCORE: f64 = 0.4;
/// Lexical score assigned when browsing with an empty query.
pub const FALLBACK_BROWSE_SCORE: f64 = 0.25;

const DEFAULT_CANDIDATE_LIMIT: i64 = 10;

/// A memory plus its normalized lexical relevance in (0, 1].
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    pub entry: MemoryEntry,
    pub lexical_score: f64,
}

/// Store-level candidate query. Inputs are assumed already validated.
#[derive(Debug, Clone)]
pub struct CandidateQuery<'a> {
    pub namespace: &'a str,
    pub query: &'a str,
    pub scope: Option<Scope>,
    pub limit: i64,
}

pub fn search_candidates(
    conn: &Connection,
    fts_enabled: bool,
    query: &CandidateQuery<'_>,
    now: DateTime<Utc>,
) -> Result<Vec<SearchCandidate>> {
    let limit = if query.limit <= 0 {
        DEFAULT_CANDIDATE_LIMIT
    } else {
        query.limit
    };
    let raw = query.query.trim();
    let terms = tokenize_query(raw);

    if !terms.is_empty() && fts_enabled {
        let expr = build_match_expression(&terms);
        match fts_search(conn, &expr, query, limit, now) {
            Ok(rows) if !rows.is_empty() => return Ok(rows),
            Ok(_) => {
                tracing::debug!(query = raw, "fts returned no rows; falling back to substring scan");
            }
            Err(e) => {
                tracing::warn!(error = %e, "fts query failed; falling back to substring scan");
            }
        }
    }

    substring_search(conn, raw, &terms, query, limit, now)
}

/// Split a query into lower-cased alphanumeric runs, deduplicated in first-seen order.
pub fn tokenize_query(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, terms: &mut Vec<String>| {
        if current.is_empty() {
            return;
        }
        let term = std::mem::take(current);
        if !terms.contains(&term) {
            terms.push(term);
        }
    };

    for ch in query.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else {
            flush(&mut current, &mut terms);
        }
    }
    flush(&mut current, &mut terms);
    terms
}

/// FTS5 expression requiring every term: `"a" AND "b"`, quotes doubled inside terms.
pub fn build_match_expression(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// BM25 rank (lower is better) mapped into (0, 1].
pub fn bm25_to_lexical(raw: f64) -> f64 {
    1.0 / (1.0 + raw.abs())
}

fn fts_search(
    conn: &Connection,
    match_expr: &str,
    query: &CandidateQuery<'_>,
    limit: i64,
    now: DateTime<Utc>,
) -> rusqlite::Result<Vec<SearchCandidate>> {
    let sql = format!(
        "SELECT {MEMORY_COLUMNS_M}, bm25(memories_fts) AS bm \
         FROM memories_fts \
         JOIN memories m ON m.id = memories_fts.id \
         WHERE memories_fts MATCH ?1 \
           AND m.namespace = ?2 \
           AND (m.expires_at IS NULL OR m.expires_at > ?3) \
           AND (?4 IS NULL OR m.scope = ?4) \
         ORDER BY bm ASC LIMIT ?5"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                match_expr,
                query.namespace,
                format_timestamp(now),
                query.scope.map(|s| s.as_str()),
                limit,
            ],
            |row| {
                let entry = memory_from_row(row)?;
                let bm: f64 = row.get(12)?;
                Ok(SearchCandidate {
                    entry,
                    lexical_score: bm25_to_lexical(bm),
                })
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn substring_search(
    conn: &Connection,
    raw_query: &str,
    terms: &[String],
    query: &CandidateQuery<'_>,
    limit: i64,
    now: DateTime<Utc>,
) -> Result<Vec<SearchCandidate>> {
    let mut sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories \
         WHERE namespace = ? AND (expires_at IS NULL OR expires_at > ?)"
    );
    let mut args: Vec<Value> = vec![
        Value::Text(query.namespace.to_string()),
        Value::Text(format_timestamp(now)),
    ];

    if let Some(scope) = query.scope {
        sql.push_str(" AND scope = ?");
        args.push(Value::Text(scope.as_str().to_string()));
    }

    // Tokens are ANDed; a token-less but non-empty query is matched verbatim.
    let needles: Vec<&str> = if terms.is_empty() && !raw_query.is_empty() {
        vec![raw_query]
    } else {
        terms.iter().map(String::as_str).collect()
    };
    for needle in needles {
        sql.push_str(" AND (content LIKE ? ESCAPE '\\' OR summary LIKE ? ESCAPE '\\')");
        let pattern = format!("%{}%", escape_like(needle));
        args.push(Value::Text(pattern.clone()));
        args.push(Value::Text(pattern));
    }

    sql.push_str(" ORDER BY created_at DESC LIMIT ?");
    args.push(Value::Integer(limit));

    let lexical_score = if raw_query.is_empty() {
        FALLBACK_BROWSE_SCORE
    } else {
        FALLBACK_QUERY_SCORE
    };

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args), |row| {
            Ok(SearchCandidate {
                entry: memory_from_row(row)?,
                lexical_score,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::store::insert_memory;

    fn insert(
        conn: &Connection,
        fts: bool,
        id: &str,
        content: &str,
        summary: &str,
        scope: Scope,
        created_at: DateTime<Utc>,
    ) {
        let entry = MemoryEntry {
            id: id.into(),
            namespace: "org/repo/task".into(),
            scope,
            content: content.into(),
            summary: summary.into(),
            importance: 3,
            source_agent: None,
            metadata: None,
            created_at,
            last_accessed_at: created_at,
            expires_at: (scope == Scope::Short).then(|| created_at + chrono::Duration::hours(1)),
            promoted_at: None,
        };
        insert_memory(conn, fts, &entry).unwrap();
    }

    fn query<'a>(q: &'a str) -> CandidateQuery<'a> {
        CandidateQuery {
            namespace: "org/repo/task",
            query: q,
            scope: None,
            limit: 10,
        }
    }

    #[test]
    fn tokenize_splits_on_punctuation_and_dedups() {
        assert_eq!(
            tokenize_query("Shared-Memory startup, shared MEMORY!"),
            vec!["shared", "memory", "startup"]
        );
        assert!(tokenize_query("  ?!  ").is_empty());
        assert!(tokenize_query("").is_empty());
    }

    #[test]
    fn match_expression_ands_quoted_terms() {
        let terms = vec!["db".to_string(), "mi\"g".to_string()];
        assert_eq!(build_match_expression(&terms), "\"db\" AND \"mi\"\"g\"");
    }

    #[test]
    fn bm25_maps_into_unit_interval() {
        assert_eq!(bm25_to_lexical(0.0), 1.0);
        assert!((bm25_to_lexical(-3.0) - 0.25).abs() < 1e-12);
        assert!(bm25_to_lexical(-1e6) > 0.0);
    }

    #[test]
    fn fts_path_scores_by_bm25() {
        let store = db::open_memory_database().unwrap();
        let conn = store.lock().unwrap();
        let now = Utc::now();
        insert(&conn, true, "a", "database migration completed", "migration", Scope::Long, now);
        insert(&conn, true, "b", "unrelated note", "note", Scope::Long, now);

        let hits = search_candidates(&conn, true, &query("migration"), now).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, "a");
        assert!(hits[0].lexical_score > 0.0 && hits[0].lexical_score <= 1.0);
        assert_ne!(hits[0].lexical_score, FALLBACK_QUERY_SCORE);
    }

    #[test]
    fn fts_requires_all_terms() {
        let store = db::open_memory_database().unwrap();
        let conn = store.lock().unwrap();
        let now = Utc::now();
        insert(&conn, true, "a", "deploy the api", "", Scope::Long, now);
        insert(&conn, true, "b", "deploy the worker", "", Scope::Long, now);

        let hits = search_candidates(&conn, true, &query("deploy worker"), now).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn without_fts_falls_back_to_substring_newest_first() {
        let store = db::open_memory_database().unwrap();
        let conn = store.lock().unwrap();
        let now = Utc::now();
        insert(&conn, false, "old", "alpha deploy", "", Scope::Long, now - chrono::Duration::hours(2));
        insert(&conn, false, "new", "alpha rollback", "", Scope::Long, now);

        let hits = search_candidates(&conn, false, &query("alpha"), now).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert!(hits.iter().all(|h| h.lexical_score == FALLBACK_QUERY_SCORE));
    }

    #[test]
    fn empty_query_browses_namespace() {
        let store = db::open_memory_database().unwrap();
        let conn = store.lock().unwrap();
        let now = Utc::now();
        insert(&conn, true, "a", "one", "", Scope::Long, now);
        insert(&conn, true, "b", "two", "", Scope::Short, now);

        let hits = search_candidates(&conn, true, &query("   "), now).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.lexical_score == FALLBACK_BROWSE_SCORE));
    }

    #[test]
    fn punctuation_only_query_matches_raw_substring() {
        let store = db::open_memory_database().unwrap();
        let conn = store.lock().unwrap();
        let now = Utc::now();
        insert(&conn, true, "a", "status: ?? pending", "", Scope::Long, now);
        insert(&conn, true, "b", "status done", "", Scope::Long, now);

        let hits = search_candidates(&conn, true, &query("??"), now).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn expired_rows_and_other_scopes_are_filtered() {
        let store = db::open_memory_database().unwrap();
        let conn = store.lock().unwrap();
        let now = Utc::now();
        // Created three hours ago with a one hour TTL: already expired.
        insert(&conn, true, "expired", "release notes", "", Scope::Short, now - chrono::Duration::hours(3));
        insert(&conn, true, "short", "release plan", "", Scope::Short, now);
        insert(&conn, true, "long", "release policy", "", Scope::Long, now);

        let hits = search_candidates(&conn, true, &query("release"), now).unwrap();
        assert!(hits.iter().all(|h| h.entry.id != "expired"));
        assert_eq!(hits.len(), 2);

        let mut long_only = query("release");
        long_only.scope = Some(Scope::Long);
        let hits = search_candidates(&conn, true, &long_only, now).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["long"]);
    }

    #[test]
    fn other_namespaces_are_invisible() {
        let store = db::open_memory_database().unwrap();
        let conn = store.lock().unwrap();
        let now = Utc::now();
        insert(&conn, true, "a", "shared fact", "", Scope::Long, now);

        let mut other = query("shared");
        other.namespace = "org/other/task";
        assert!(search_candidates(&conn, true, &other, now).unwrap().is_empty());
    }

    #[test]
    fn like_wildcards_are_literal() {
        let store = db::open_memory_database().unwrap();
        let conn = store.lock().unwrap();
        let now = Utc::now();
        insert(&conn, false, "pct", "100% done", "", Scope::Long, now);
        insert(&conn, false, "plain", "1000 done", "", Scope::Long, now);

        let hits = search_candidates(&conn, false, &query("%"), now).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["pct"]);
    }
}
