//! `memory_search` tool parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::memory::types::SearchInput;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemorySearchParams {
    #[schemars(description = "Namespace path to search in")]
    pub namespace: String,

    #[schemars(description = "Keyword query. An empty query lists recent memories.")]
    pub query: String,

    #[schemars(description = "Restrict to 'short' or 'long' memories")]
    #[serde(default)]
    pub scope: Option<String>,

    #[schemars(description = "Maximum number of results (max 100). Defaults to the configured k.")]
    #[serde(default)]
    pub k: Option<i64>,

    #[schemars(description = "Include each memory's metadata object in results")]
    #[serde(default)]
    pub include_metadata: bool,
}

impl From<MemorySearchParams> for SearchInput {
    fn from(p: MemorySearchParams) -> Self {
        Self {
            namespace: p.namespace,
            query: p.query,
            scope: p.scope,
            k: p.k,
            include_metadata: p.include_metadata,
        }
    }
}
