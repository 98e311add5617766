//! Request routing, tool execution and per-request observability.
//!
//! Every decoded message produces exactly one [`RequestEvent`], whether or not
//! it gets a reply. Tool failures are reported inside a successful JSON-RPC
//! result (`isError: true`); only envelope problems use JSON-RPC error objects.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Value};

use super::counters::{CounterSnapshot, RequestCounters};
use super::protocol::{JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR};
use crate::db::request_log::{insert_request_event, RequestEvent};
use crate::db::Store;
use crate::error::MemoryError;
use crate::memory::MemoryService;
use crate::tools::{self, ToolCall};

pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Destination for per-request events.
pub trait RequestEventSink: Send + Sync {
    fn record_event(&self, event: &RequestEvent) -> Result<(), MemoryError>;
}

impl RequestEventSink for Store {
    fn record_event(&self, event: &RequestEvent) -> Result<(), MemoryError> {
        let conn = self.lock()?;
        insert_request_event(&conn, event)?;
        Ok(())
    }
}

pub struct Dispatcher {
    service: MemoryService,
    sink: Option<Arc<dyn RequestEventSink>>,
    counters: RequestCounters,
    server_name: String,
}

impl Dispatcher {
    /// Dispatcher that records request events into the service's own store.
    pub fn new(service: MemoryService) -> Self {
        let sink: Arc<dyn RequestEventSink> = Arc::new(service.store().clone());
        let server_name = service.config().server.name.clone();
        Self {
            service,
            sink: Some(sink),
            counters: RequestCounters::default(),
            server_name,
        }
    }

    pub fn with_sink(mut self, sink: Option<Arc<dyn RequestEventSink>>) -> Self {
        self.sink = sink;
        self
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Handle one raw payload. `None` means no reply is sent.
    pub async fn handle_payload(&self, payload: &[u8]) -> Option<JsonRpcResponse> {
        let started = Instant::now();

        let request: JsonRpcRequest = match serde_json::from_slice(payload) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "invalid JSON-RPC request");
                let response =
                    JsonRpcResponse::error(Value::Null, PARSE_ERROR, "parse error", Some(json!(e.to_string())));
                self.record("parse_error", "", &response, started).await;
                return Some(response);
            }
        };

        let tool_name = if request.method == "tools/call" {
            request
                .params
                .get("name")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };
        let notification = request.is_notification();
        let method = request.method.clone();

        let response = self.route(request).await;
        match &response {
            Some(r) => self.record(&method, &tool_name, r, started).await,
            // Nothing to inspect for unanswered notifications; they count as handled.
            None => {
                let handled = JsonRpcResponse::success(Value::Null, json!({}));
                self.record(&method, &tool_name, &handled, started).await
            }
        }

        if notification {
            None
        } else {
            response
        }
    }

    async fn route(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone().unwrap_or(Value::Null);
        let response = match request.method.as_str() {
            "notifications/initialized" => return None,
            "initialize" => {
                let protocol_version = request
                    .params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .unwrap_or(DEFAULT_PROTOCOL_VERSION);
                JsonRpcResponse::success(
                    id,
                    json!({
                        "protocolVersion": protocol_version,
                        "capabilities": {"tools": {"listChanged": false}},
                        "serverInfo": {
                            "name": self.server_name,
                            "version": env!("CARGO_PKG_VERSION"),
                        },
                    }),
                )
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({"tools": tools::tool_definitions()})),
            "tools/call" => JsonRpcResponse::success(id, self.call_tool(request.params).await),
            other => {
                if request.id.is_none() {
                    return None;
                }
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, "method not found", Some(json!(other)))
            }
        };
        Some(response)
    }

    async fn call_tool(&self, params: Value) -> Value {
        let call = match ToolCall::parse(params) {
            Ok(call) => call,
            Err(message) => return tools::tool_error(message),
        };
        let tool = call.name();

        let service = self.service.clone();
        match tokio::task::spawn_blocking(move || call.execute(&service)).await {
            Ok(Ok(value)) => tools::tool_success(value),
            Ok(Err(e)) => {
                if !e.is_caller_error() {
                    tracing::warn!(tool, error = %e, "tool failed");
                }
                tools::tool_error(e.to_string())
            }
            Err(e) => {
                tracing::warn!(tool, error = %e, "tool task panicked");
                tools::tool_error(format!("tool task failed: {e}"))
            }
        }
    }

    async fn record(&self, method: &str, tool_name: &str, response: &JsonRpcResponse, started: Instant) {
        let (success, error_text) = outcome(response);
        let duration_ms = started.elapsed().as_millis() as i64;
        self.counters.record(success);

        if success {
            tracing::debug!(method, tool = tool_name, success, duration_ms, "request handled");
        } else {
            tracing::warn!(method, tool = tool_name, success, duration_ms, error = %error_text, "request failed");
        }

        let Some(sink) = self.sink.clone() else {
            return;
        };
        let event = RequestEvent {
            id: 0,
            method: method.to_string(),
            tool_name: tool_name.to_string(),
            success,
            error_text,
            duration_ms,
            created_at: Utc::now(),
        };
        match tokio::task::spawn_blocking(move || sink.record_event(&event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to persist request event"),
            Err(e) => tracing::warn!(error = %e, "request event task failed"),
        }
    }
}

/// Success flag and error text for a response: protocol errors and tool
/// results flagged `isError` both count as failures.
fn outcome(response: &JsonRpcResponse) -> (bool, String) {
    if let Some(err) = &response.error {
        return (false, err.message.trim().to_string());
    }
    let Some(result) = &response.result else {
        return (true, String::new());
    };
    if result.get("isError").and_then(Value::as_bool) != Some(true) {
        return (true, String::new());
    }
    let text = result
        .get("content")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    if text.is_empty() {
        (false, "tool call failed".to_string())
    } else {
        (false, text.to_string())
    }
}
