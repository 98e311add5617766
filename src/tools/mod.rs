//! Tool catalog and invocation for `tools/list` and `tools/call`.
//!
//! Each tool has a params struct (serde + schemars) in its own module. The
//! catalog's `inputSchema` is generated from those structs, so the schema a
//! client sees and the shape the server accepts cannot drift apart.

pub mod memory_get_context_pack;
pub mod memory_promote;
pub mod memory_search;
pub mod memory_write;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use memory_get_context_pack::MemoryGetContextPackParams;
use memory_promote::MemoryPromoteParams;
use memory_search::MemorySearchParams;
use memory_write::MemoryWriteParams;

use crate::error::Result;
use crate::memory::MemoryService;

/// One entry of the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// A decoded `tools/call` request.
#[derive(Debug)]
pub enum ToolCall {
    Write(MemoryWriteParams),
    Search(MemorySearchParams),
    ContextPack(MemoryGetContextPackParams),
    Promote(MemoryPromoteParams),
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

impl ToolCall {
    /// Decode `{name, arguments}`. The error string is returned to the caller as a tool error.
    pub fn parse(params: Value) -> std::result::Result<Self, String> {
        let p: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| format!("invalid tools/call params: {e}"))?;
        let name = p.name.trim();
        let arguments = match p.arguments {
            None | Some(Value::Null) => json!({}),
            Some(v) => v,
        };

        fn args<T: for<'de> Deserialize<'de>>(name: &str, arguments: Value) -> std::result::Result<T, String> {
            serde_json::from_value(arguments).map_err(|e| format!("invalid {name} arguments: {e}"))
        }

        match name {
            "memory_write" => Ok(Self::Write(args(name, arguments)?)),
            "memory_search" => Ok(Self::Search(args(name, arguments)?)),
            "memory_get_context_pack" => Ok(Self::ContextPack(args(name, arguments)?)),
            "memory_promote" => Ok(Self::Promote(args(name, arguments)?)),
            other => Err(format!("unknown tool {other:?}")),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Write(_) => "memory_write",
            Self::Search(_) => "memory_search",
            Self::ContextPack(_) => "memory_get_context_pack",
            Self::Promote(_) => "memory_promote",
        }
    }

    /// Run the tool against the service. Blocking.
    pub fn execute(self, service: &MemoryService) -> Result<Value> {
        let value = match self {
            Self::Write(p) => serde_json::to_value(service.write(p.into())?)?,
            Self::Search(p) => serde_json::to_value(service.search(p.into())?)?,
            Self::ContextPack(p) => serde_json::to_value(service.context_pack(p.into())?)?,
            Self::Promote(p) => serde_json::to_value(service.promote(p.into())?)?,
        };
        Ok(value)
    }
}

/// The four tools, in catalog order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "memory_write",
            description: "Store a new short-term or long-term memory entry.",
            input_schema: input_schema(schemars::schema_for!(MemoryWriteParams)),
        },
        ToolDefinition {
            name: "memory_search",
            description: "Search memory by lexical relevance + recency + importance.",
            input_schema: input_schema(schemars::schema_for!(MemorySearchParams)),
        },
        ToolDefinition {
            name: "memory_get_context_pack",
            description: "Return a compact, deduplicated context pack under a token budget.",
            input_schema: input_schema(schemars::schema_for!(MemoryGetContextPackParams)),
        },
        ToolDefinition {
            name: "memory_promote",
            description: "Promote a memory entry to long-term memory.",
            input_schema: input_schema(schemars::schema_for!(MemoryPromoteParams)),
        },
    ]
}

fn input_schema(schema: schemars::Schema) -> Value {
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}));
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
    }
    value
}

/// Successful tool result: pretty JSON text plus the structured value.
pub fn tool_success(value: Value) -> Value {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    json!({
        "content": [{"type": "text", "text": text}],
        "structuredContent": value,
        "isError": false,
    })
}

pub fn tool_error(message: impl Into<String>) -> Value {
    json!({
        "content": [{"type": "text", "text": message.into()}],
        "isError": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_four_tools_with_required_fields() {
        let tools = tool_definitions();
        let names: Vec<_> = tools.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["memory_write", "memory_search", "memory_get_context_pack", "memory_promote"]
        );

        let required = |i: usize| -> Vec<String> {
            let mut r: Vec<String> = tools[i].input_schema["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect();
            r.sort();
            r
        };
        assert_eq!(required(0), vec!["content", "namespace"]);
        assert_eq!(required(1), vec!["namespace", "query"]);
        assert_eq!(required(2), vec!["namespace", "query", "token_budget"]);
        assert_eq!(required(3), vec!["memory_id"]);
        assert_eq!(tools[0].input_schema["type"], "object");
    }

    #[test]
    fn parse_dispatches_on_name() {
        let call = ToolCall::parse(json!({
            "name": "memory_search",
            "arguments": {"namespace": "a/b", "query": "x", "extra": 1}
        }))
        .unwrap();
        assert_eq!(call.name(), "memory_search");
    }

    #[test]
    fn parse_rejects_unknown_tool_and_missing_fields() {
        let err = ToolCall::parse(json!({"name": "memory_delete", "arguments": {}})).unwrap_err();
        assert_eq!(err, "unknown tool \"memory_delete\"");

        let err = ToolCall::parse(json!({"name": "memory_write", "arguments": {"namespace": "a/b"}}))
            .unwrap_err();
        assert!(err.starts_with("invalid memory_write arguments"));
        assert!(err.contains("content"));

        let err = ToolCall::parse(json!({"name": "memory_promote"})).unwrap_err();
        assert!(err.contains("memory_id"));
    }

    #[test]
    fn result_envelopes() {
        let ok = tool_success(json!({"id": "x"}));
        assert_eq!(ok["isError"], false);
        assert_eq!(ok["structuredContent"]["id"], "x");
        assert!(ok["content"][0]["text"].as_str().unwrap().contains("\"id\": \"x\""));

        let err = tool_error("boom");
        assert_eq!(err["isError"], true);
        assert_eq!(err["content"][0]["text"], "boom");
        assert!(err.get("structuredContent").is_none());
    }
}
