//! Shared, namespaced memory for autonomous agents, served over JSON-RPC on stdio.
//!
//! Agents write short-term (TTL) or long-term memories into slash-separated
//! namespaces and read them back either as ranked search results or as a
//! compact, token-budgeted context pack.
//!
//! # Architecture
//!
//! - **Storage**: SQLite (bundled) with an FTS5 index over content and summary;
//!   substring matching takes over when the index is unavailable
//! - **Ranking**: `0.60 * lexical + 0.25 * recency + 0.15 * importance`
//! - **Lifecycle**: short-term memories expire after a TTL unless promoted; a
//!   background sweeper deletes expired rows
//! - **Transport**: `Content-Length` framed or newline-delimited JSON-RPC on
//!   stdin/stdout, detected from the first message
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with env overrides
//! - [`db`]: SQLite handle, schema and the request log
//! - [`error`]: the [`error::MemoryError`] taxonomy
//! - [`memory`]: store, search, ranking, context packs, lifecycle and the service facade
//! - [`server`]: wire framing, JSON-RPC dispatch and the stdio serve loop
//! - [`tools`]: tool parameter schemas and the `tools/list` catalog

pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod server;
pub mod tools;
