//! Core memory type definitions.
//!
//! Defines [`Scope`] (short-lived vs durable), [`MemoryEntry`] (a full record),
//! the operation inputs, and the ranked/packed outputs returned to callers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime class of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Auto-expiring working memory; carries `expires_at`.
    Short,
    /// Durable memory, never expires.
    Long,
}

impl Scope {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            _ => Err(format!("invalid scope {:?}", s.trim())),
        }
    }
}

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// UUID v7 primary key.
    pub id: String,
    pub namespace: String,
    pub scope: Scope,
    pub content: String,
    /// Caller-supplied or derived from the first 160 characters of content.
    pub summary: String,
    /// 1 (trivia) to 5 (critical).
    pub importance: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Set iff `scope` is `Short`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Set once, when a short memory is promoted to long.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_at: Option<DateTime<Utc>>,
}

/// Input for a memory write. Scope and TTL are optional and defaulted by the service.
#[derive(Debug, Clone, Default)]
pub struct WriteInput {
    pub namespace: String,
    pub content: String,
    pub scope: Option<String>,
    pub summary: Option<String>,
    pub importance: Option<i64>,
    pub source_agent: Option<String>,
    pub ttl_seconds: Option<i64>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchInput {
    pub namespace: String,
    pub query: String,
    pub scope: Option<String>,
    /// Non-positive or unset means the configured default.
    pub k: Option<i64>,
    pub include_metadata: bool,
}

/// A ranked search hit with its score breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub record: MemoryEntry,
    pub score: f64,
    pub lexical_score: f64,
    pub recency_score: f64,
    pub importance_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ContextPackInput {
    pub namespace: String,
    pub query: String,
    pub token_budget: i64,
    pub scope: Option<String>,
    pub k: Option<i64>,
}

/// A prompt-ready, deduplicated, token-budgeted bundle of memories.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextPack {
    pub text: String,
    pub estimated_tokens: usize,
    pub memory_ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PromoteInput {
    pub memory_id: String,
    pub target_scope: Option<String>,
    pub reason: Option<String>,
}

/// Fixed-width RFC 3339 UTC timestamp, so SQL string comparison is chronological.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Truncate to `limit` characters; a truncated string ends with `...` inside the limit.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit < 3 {
        return text.chars().take(limit).collect();
    }
    let mut out: String = text.chars().take(limit - 3).collect();
    out.push_str("...");
    out
}
