//! `memory_promote` tool parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::memory::types::PromoteInput;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryPromoteParams {
    #[schemars(description = "ID of the short-term memory to promote")]
    pub memory_id: String,

    #[schemars(description = "Target scope. Only 'long' is supported.")]
    #[serde(default)]
    pub target_scope: Option<String>,

    #[schemars(description = "Why this memory is worth keeping")]
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<MemoryPromoteParams> for PromoteInput {
    fn from(p: MemoryPromoteParams) -> Self {
        Self {
            memory_id: p.memory_id,
            target_scope: p.target_scope,
            reason: p.reason,
        }
    }
}
