//! Error types for the `crew-guardrail` crate.

use thiserror::Error;

/// Errors produced by the guardrail classifier.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// The model never produced a parseable JSON object within the attempt
    /// budget. `last_raw` carries the final raw reply (or transport error
    /// text) for diagnostics.
    #[error("No valid JSON after {attempts} attempt(s)")]
    NoValidJson {
        /// How many attempts were made.
        attempts: usize,
        /// The last raw model output, if any attempt got that far.
        last_raw: Option<String>,
    },

    /// The model produced JSON, but it does not match the required
    /// six-field classification shape.
    #[error("Classification structure mismatch: {reason}")]
    StructureMismatch {
        /// Why validation rejected the object.
        reason: String,
        /// The parsed object, kept for visibility.
        parsed: serde_json::Value,
    },
}

/// A convenience result type for guardrail operations.
pub type Result<T> = std::result::Result<T, GuardrailError>;
