//! In-memory fallback vector backend.
//!
//! Same contract as the filesystem store minus persistence: the four aligned
//! sequences live in process memory and vanish with the process. Used when
//! the persistent backend cannot be opened, and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{AddOutcome, VectorBackend};
use crate::document::{Document, SearchHit};
use crate::error::{RagError, Result};

/// Floor added to the query norm so a zero-norm query divides cleanly.
///
/// Deliberately different from the persisted backend, which clamps a zero
/// norm to exactly 1.0; both strategies are preserved as observed behavior.
const QUERY_NORM_EPS: f32 = 1e-12;

#[derive(Debug, Default)]
struct MemState {
    ids: Vec<String>,
    texts: Vec<String>,
    metas: Vec<HashMap<String, serde_json::Value>>,
    vectors: Vec<Vec<f32>>,
}

/// A vector backend holding one collection entirely in memory.
///
/// Vectors are stored raw (not normalized); queries compute cosine
/// similarity as dot product over the product of norms.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    state: RwLock<MemState>,
}

impl MemoryVectorStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorBackend for MemoryVectorStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn add(&self, docs: &[Document], embeddings: &[Vec<f32>]) -> Result<AddOutcome> {
        if docs.is_empty() {
            return Ok(AddOutcome::default());
        }
        if docs.len() != embeddings.len() {
            return Err(RagError::Backend {
                backend: "memory".into(),
                message: format!(
                    "{} documents but {} embeddings",
                    docs.len(),
                    embeddings.len()
                ),
            });
        }

        let mut state = self.state.write().await;
        for (doc, embedding) in docs.iter().zip(embeddings) {
            state.ids.push(doc.id.clone());
            state.texts.push(doc.text.clone());
            state.metas.push(doc.metadata.clone());
            state.vectors.push(embedding.clone());
        }
        debug!(appended = docs.len(), total = state.ids.len(), "added documents");
        Ok(AddOutcome { appended: docs.len(), ..AddOutcome::default() })
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let state = self.state.read().await;
        if state.ids.is_empty() {
            return Ok(Vec::new());
        }

        let query_norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt() + QUERY_NORM_EPS;
        let mut scored: Vec<(usize, f32)> = state
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, vector)| {
                let dot: f32 = vector.iter().zip(embedding.iter()).map(|(x, y)| x * y).sum();
                let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
                (pos, dot / (norm * query_norm))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| SearchHit {
                id: state.ids[pos].clone(),
                text: state.texts[pos].clone(),
                metadata: state.metas[pos].clone(),
                score,
            })
            .collect())
    }

    async fn persist(&self) -> Result<()> {
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = MemState::default();
        Ok(())
    }
}
