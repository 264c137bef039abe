//! Data types for documents and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A document to be indexed: an id, its text, and free-form metadata.
///
/// Ids are expected to be unique within a collection; the store does not
/// enforce this (additions are append-only, never upserts).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new() }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A retrieved document paired with a relevance score.
///
/// The score is the raw inner product of the normalized stored vector and the
/// normalized query vector, i.e. cosine similarity (higher is more relevant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The id of the retrieved document.
    pub id: String,
    /// The text of the retrieved document.
    pub text: String,
    /// The metadata of the retrieved document.
    pub metadata: HashMap<String, serde_json::Value>,
    /// Cosine similarity between the query and the stored vector.
    pub score: f32,
}
