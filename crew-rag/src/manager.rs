//! Retrieval manager: one uniform API over whichever backend is active.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backend::VectorBackend;
use crate::document::{Document, SearchHit};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::fsstore::FsVectorStore;
use crate::inmemory::MemoryVectorStore;

/// Manages documents and performs semantic search over one collection.
///
/// Owns the embedding provider and a backend resolved once at construction.
/// A single mutex serializes add/search/persist/clear per manager instance;
/// operations never interleave on the same instance. The manager assumes a
/// single process owns the storage directory.
pub struct RagManager {
    embedder: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn VectorBackend>,
    lock: Mutex<()>,
}

impl RagManager {
    /// Construct a manager with an already-resolved backend.
    pub fn with_backend(
        embedder: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn VectorBackend>,
    ) -> Self {
        Self { embedder, backend, lock: Mutex::new(()) }
    }

    /// Construct a manager over the filesystem backend, falling back to an
    /// in-memory store if the storage directory cannot be opened.
    ///
    /// The fallback is permanent for this instance's lifetime; the backend
    /// choice is never re-evaluated per call.
    pub fn open(
        embedder: Arc<dyn EmbeddingProvider>,
        storage_dir: impl AsRef<Path>,
        collection: impl Into<String>,
    ) -> Self {
        let collection = collection.into();
        let backend: Arc<dyn VectorBackend> =
            match FsVectorStore::open_or_create(storage_dir.as_ref(), collection.clone()) {
                Ok(store) => {
                    info!(
                        %collection,
                        storage_dir = %storage_dir.as_ref().display(),
                        "using filesystem vector backend"
                    );
                    Arc::new(store)
                }
                Err(e) => {
                    warn!(
                        %collection,
                        error = %e,
                        "filesystem backend unavailable, falling back to in-memory store"
                    );
                    Arc::new(MemoryVectorStore::new())
                }
            };
        Self::with_backend(embedder, backend)
    }

    /// The name of the active backend (`"fs"` or `"memory"`).
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Add documents to the collection. No-op on empty input.
    ///
    /// Texts are embedded in one batch call, then appended under the manager
    /// lock. Persistence failures in the backend are logged and tolerated:
    /// the documents remain queryable for the lifetime of the process.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the batch embed fails, or
    /// [`RagError::Backend`] for hard backend errors (not persistence
    /// degradations).
    pub async fn add_documents(&self, docs: Vec<Document>) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let _guard = self.lock.lock().await;
        let outcome = self.backend.add(&docs, &embeddings).await?;
        if let Some((old_dim, new_dim)) = outcome.rebuilt_dimension {
            warn!(
                backend = self.backend.name(),
                old_dim,
                new_dim,
                "collection rebuilt for new embedding dimension, prior documents dropped"
            );
        }
        if let Some(error) = &outcome.persist_error {
            warn!(
                backend = self.backend.name(),
                %error,
                "documents added but not persisted"
            );
        }
        Ok(())
    }

    /// Return the top-`k` documents for the query text, ordered by
    /// descending cosine similarity. An empty collection yields an empty vec.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let embeddings = self.embedder.embed_batch(&[query]).await?;
        let query_vec = embeddings.into_iter().next().ok_or_else(|| RagError::Embedding {
            provider: "unknown".into(),
            message: "embedder returned no vector for query".into(),
        })?;

        let _guard = self.lock.lock().await;
        self.backend.query(&query_vec, k).await
    }

    /// Flush backend state. No-op for both bundled backends, which write
    /// through on every add (or hold nothing durable).
    pub async fn persist(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.backend.persist().await
    }

    /// Reset the collection to empty. On the filesystem backend this removes
    /// the collection files, so the next add starts a fresh index and the
    /// dimension lock is reset.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.backend.clear().await
    }
}
