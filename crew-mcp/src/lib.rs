//! Minimal HTTP control endpoint for crewkit orchestration.
//!
//! One route, `POST /mcp`, accepting `{"action": ..., "payload": {...}}` and
//! dispatching onto the transaction ledger. The wire contract (actions, field
//! names, status codes, error strings) is fixed; see [`router`].
//!
//! The server holds a single [`Ledger`] as shared state; per-request
//! concurrency is whatever the ledger's connection pool serializes
//! internally. No authentication — bind to loopback.

pub mod error;
pub mod server;

pub use error::{McpError, Result};
pub use server::{router, serve, McpConfig, ServerHandle};
