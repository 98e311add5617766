//! `memory_get_context_pack` tool parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::memory::types::ContextPackInput;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryGetContextPackParams {
    #[schemars(description = "Namespace path to pack memories from")]
    pub namespace: String,

    #[schemars(description = "Keyword query used to rank candidate memories")]
    pub query: String,

    #[schemars(description = "Token budget for the pack (about 4 characters per token). 0 means 512.")]
    pub token_budget: i64,

    #[schemars(description = "Restrict to 'short' or 'long' memories")]
    #[serde(default)]
    pub scope: Option<String>,

    #[schemars(description = "Maximum number of memories considered (max 50)")]
    #[serde(default)]
    pub k: Option<i64>,
}

impl From<MemoryGetContextPackParams> for ContextPackInput {
    fn from(p: MemoryGetContextPackParams) -> Self {
        Self {
            namespace: p.namespace,
            query: p.query,
            token_budget: p.token_budget,
            scope: p.scope,
            k: p.k,
        }
    }
}
