//! Error types for the `crew-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector backend could not be initialized or failed an operation.
    ///
    /// Missing or corrupt persisted state is *not* reported through this
    /// variant; backends degrade to empty results for those conditions and
    /// record tolerated degradations in [`AddOutcome`](crate::AddOutcome).
    #[error("Backend error ({backend}): {message}")]
    Backend {
        /// The backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
