//! Error types for the `crew-mcp` crate.

use thiserror::Error;

/// Errors that can occur starting or stopping the control endpoint.
#[derive(Debug, Error)]
pub enum McpError {
    /// The listen address could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// The requested listen address.
        addr: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// A convenience result type for server operations.
pub type Result<T> = std::result::Result<T, McpError>;
