//! `memory_write` tool parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::memory::types::WriteInput;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryWriteParams {
    #[schemars(description = "Namespace path, e.g. 'org/repo/task'")]
    pub namespace: String,

    #[schemars(description = "The memory text to store")]
    pub content: String,

    #[schemars(description = "'short' (expires after a TTL) or 'long' (durable). Defaults to 'short'.")]
    #[serde(default)]
    pub scope: Option<String>,

    #[schemars(description = "Optional one-line summary. Derived from content when omitted.")]
    #[serde(default)]
    pub summary: Option<String>,

    #[schemars(description = "Importance 1 (trivia) to 5 (critical). Defaults to 3.")]
    #[serde(default)]
    pub importance: Option<i64>,

    #[schemars(description = "Name of the agent writing this memory")]
    #[serde(default)]
    pub source_agent: Option<String>,

    #[schemars(description = "TTL in seconds for short-term memories. Defaults to the configured TTL.")]
    #[serde(default)]
    pub ttl_seconds: Option<i64>,

    #[schemars(description = "Optional JSON object of caller metadata")]
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl From<MemoryWriteParams> for WriteInput {
    fn from(p: MemoryWriteParams) -> Self {
        Self {
            namespace: p.namespace,
            content: p.content,
            scope: p.scope,
            summary: p.summary,
            importance: p.importance,
            source_agent: p.source_agent,
            ttl_seconds: p.ttl_seconds,
            metadata: p.metadata,
        }
    }
}
