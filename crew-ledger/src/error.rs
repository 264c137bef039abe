//! Error types for the `crew-ledger` crate.

use thiserror::Error;

/// Errors that can occur in ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The database file or its parent directory could not be prepared.
    #[error("Failed to prepare database at {path}: {source}")]
    Prepare {
        /// The requested database path.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// An error from the underlying SQLite driver.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
