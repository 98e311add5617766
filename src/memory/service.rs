//! Validated entry points for every memory operation.
//!
//! [`MemoryService`] owns the input rules (namespace pattern, scope parsing,
//! defaults and caps) and composes the store, search, ranking, context-pack and
//! lifecycle layers. All methods are blocking; async callers wrap them in
//! `tokio::task::spawn_blocking`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use regex::Regex;

use super::context_pack;
use super::lifecycle;
use super::ranking;
use super::search::{search_candidates, CandidateQuery};
use super::stats::{self, RecentMemory, Stats};
use super::store::{self, PromoteOutcome};
use super::types::{
    truncate_chars, ContextPack, ContextPackInput, MemoryEntry, PromoteInput, Scope, SearchInput,
    SearchResult, WriteInput,
};
use crate::config::MemoryConfig;
use crate::db::Store;
use crate::error::{MemoryError, Result};

/// Hard cap on search results per call.
pub const MAX_SEARCH_K: i64 = 100;
/// Hard cap on items considered for one context pack.
pub const MAX_CONTEXT_PACK_K: i64 = 50;
pub const DEFAULT_TOKEN_BUDGET: i64 = 512;
const AUTO_SUMMARY_CHARS: usize = 160;
const DEFAULT_IMPORTANCE: i64 = 3;

#[derive(Clone)]
pub struct MemoryService {
    store: Store,
    config: Arc<MemoryConfig>,
    namespace_re: Arc<Regex>,
}

impl MemoryService {
    pub fn new(store: Store, config: Arc<MemoryConfig>) -> Result<Self> {
        let namespace_re = Regex::new(&config.memory.namespace_pattern).map_err(|e| {
            MemoryError::validation(format!("invalid namespace pattern: {e}"))
        })?;
        Ok(Self {
            store,
            config,
            namespace_re: Arc::new(namespace_re),
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Store a new memory. Scope defaults to short; short entries get an expiry.
    pub fn write(&self, input: WriteInput) -> Result<MemoryEntry> {
        let namespace = self.validate_namespace(&input.namespace)?;
        let scope = parse_scope(input.scope.as_deref())?.unwrap_or(Scope::Short);
        if input.content.trim().is_empty() {
            return Err(MemoryError::validation("content must not be empty"));
        }

        let importance = match input.importance {
            Some(i) if (1..=5).contains(&i) => i,
            _ => DEFAULT_IMPORTANCE,
        };
        let summary = match input.summary.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => truncate_chars(input.content.trim(), AUTO_SUMMARY_CHARS),
        };
        let source_agent = input
            .source_agent
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let now = Utc::now();
        let expires_at = match scope {
            Scope::Short => {
                let ttl_seconds = match input.ttl_seconds {
                    Some(t) if t > 0 => t,
                    _ => self.config.memory.default_short_ttl_hours.saturating_mul(3600),
                };
                let expires_at = Duration::try_seconds(ttl_seconds)
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .ok_or_else(|| MemoryError::validation("ttl_seconds is too large"))?;
                Some(expires_at)
            }
            Scope::Long => None,
        };

        let entry = MemoryEntry {
            id: uuid::Uuid::now_v7().to_string(),
            namespace,
            scope,
            content: input.content,
            summary,
            importance,
            source_agent,
            metadata: input.metadata,
            created_at: now,
            last_accessed_at: now,
            expires_at,
            promoted_at: None,
        };

        let conn = self.store.lock()?;
        store::insert_memory(&conn, self.store.fts_enabled(), &entry)?;
        tracing::debug!(
            id = %entry.id,
            namespace = %entry.namespace,
            scope = %entry.scope,
            "memory written"
        );
        Ok(entry)
    }

    /// Ranked retrieval over live memories in one namespace.
    pub fn search(&self, input: SearchInput) -> Result<Vec<SearchResult>> {
        let namespace = self.validate_namespace(&input.namespace)?;
        let scope = parse_scope(input.scope.as_deref())?;
        let k = match input.k {
            Some(k) if k > 0 => k,
            _ => self.config.memory.default_search_k,
        }
        .min(MAX_SEARCH_K);

        let now = Utc::now();
        let query = CandidateQuery {
            namespace: &namespace,
            query: &input.query,
            scope,
            limit: k * 3,
        };
        let candidates = {
            let conn = self.store.lock()?;
            search_candidates(&conn, self.store.fts_enabled(), &query, now)?
        };

        Ok(ranking::rank(candidates, now, k as usize, input.include_metadata))
    }

    /// Ranked search folded into a deduplicated, token-budgeted text block.
    pub fn context_pack(&self, input: ContextPackInput) -> Result<ContextPack> {
        let budget = if input.token_budget <= 0 {
            DEFAULT_TOKEN_BUDGET
        } else {
            input.token_budget
        };
        let k = match input.k {
            Some(k) if k > 0 => k,
            _ => self.config.memory.max_context_pack_items,
        }
        .min(MAX_CONTEXT_PACK_K);

        let results = self.search(SearchInput {
            namespace: input.namespace,
            query: input.query,
            scope: input.scope,
            k: Some(k),
            include_metadata: false,
        })?;

        Ok(context_pack::assemble(&results, budget as usize))
    }

    /// Promote a short memory to long scope and return the updated entry.
    pub fn promote(&self, input: PromoteInput) -> Result<MemoryEntry> {
        let id = input.memory_id.trim();
        if id.is_empty() {
            return Err(MemoryError::validation("memory_id is required"));
        }
        let target = input
            .target_scope
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("long");
        if !target.eq_ignore_ascii_case("long") {
            return Err(MemoryError::validation("only target_scope=long is supported"));
        }

        let conn = self.store.lock()?;
        match store::promote_memory(&conn, id, Utc::now())? {
            PromoteOutcome::Promoted => {}
            PromoteOutcome::NotFound => return Err(MemoryError::NotFound(id.to_string())),
            PromoteOutcome::AlreadyLong => {
                return Err(MemoryError::validation(format!(
                    "memory {id} is already long-term"
                )))
            }
        }
        tracing::info!(id, reason = input.reason.as_deref().unwrap_or(""), "memory promoted");

        store::get_memory(&conn, id)?.ok_or_else(|| MemoryError::NotFound(id.to_string()))
    }

    /// Run one TTL sweep now.
    pub fn expire_short(&self) -> Result<usize> {
        let conn = self.store.lock()?;
        Ok(lifecycle::expire_short(&conn, self.store.fts_enabled(), Utc::now())?)
    }

    pub fn stats(&self) -> Result<Stats> {
        let conn = self.store.lock()?;
        Ok(stats::stats(&conn, Utc::now())?)
    }

    pub fn recent_memories(&self, limit: i64) -> Result<Vec<RecentMemory>> {
        let conn = self.store.lock()?;
        Ok(stats::recent_memories(&conn, limit)?)
    }

    fn validate_namespace(&self, namespace: &str) -> Result<String> {
        let namespace = namespace.trim();
        if namespace.is_empty() {
            return Err(MemoryError::validation("namespace is required"));
        }
        if !self.namespace_re.is_match(namespace) {
            return Err(MemoryError::validation(format!(
                "namespace {namespace:?} does not match required pattern"
            )));
        }
        Ok(namespace.to_string())
    }
}

/// Blank or absent means "no scope given".
fn parse_scope(raw: Option<&str>) -> Result<Option<Scope>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<Scope>().map(Some).map_err(MemoryError::Validation),
    }
}
