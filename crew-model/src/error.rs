//! Error types for the `crew-model` crate.

use thiserror::Error;

/// Errors that can occur when calling a chat model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No client could be constructed: required configuration is missing.
    /// This is fatal to the calling code path; there is no retry.
    #[error("No chat model available: {0}")]
    Unavailable(String),

    /// The request failed or the API returned an error status.
    #[error("Model request failed ({model}): {message}")]
    Request {
        /// The model the request was sent to.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The API responded but the body could not be interpreted.
    #[error("Malformed model response ({model}): {message}")]
    MalformedResponse {
        /// The model that produced the response.
        model: String,
        /// A description of the failure.
        message: String,
    },
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
