//! Vector backend trait: the uniform add/query/persist/clear contract.

use async_trait::async_trait;

use crate::document::{Document, SearchHit};
use crate::error::Result;

/// What happened during an `add`, beyond the append itself.
///
/// Backends tolerate corrupt or missing persisted state and failed writes
/// rather than failing the caller; this record surfaces those degradations
/// explicitly so the caller owns the tolerance policy.
#[derive(Debug, Clone, Default)]
pub struct AddOutcome {
    /// Number of documents appended in this call.
    pub appended: usize,
    /// An existing index file could not be parsed and was discarded.
    pub dropped_corrupt_index: bool,
    /// The existing index had a different dimension than the incoming batch
    /// and was rebuilt empty: `(old_dim, new_dim)`. All previously stored
    /// documents in the collection were dropped.
    pub rebuilt_dimension: Option<(usize, usize)>,
    /// Persisting the index or sidecar files failed. The in-memory append
    /// still succeeded, so the documents are queryable for the lifetime of
    /// the process but were not made durable.
    pub persist_error: Option<String>,
}

impl AddOutcome {
    /// Whether the appended documents were fully persisted.
    pub fn is_durable(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// A storage backend for one collection of embedded documents.
///
/// Implementations keep four positionally aligned sequences: ids, texts,
/// metadatas, and vector rows. Every `add` extends all four by the same
/// count, in the same order. There is no update or delete-by-id; the only
/// mutation is append (plus [`clear`](VectorBackend::clear), which resets the
/// whole collection).
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// A short name identifying the backend, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Append documents with their (pre-normalization) embeddings.
    ///
    /// `docs` and `embeddings` must have equal length; embeddings in one call
    /// share a single dimensionality.
    async fn add(&self, docs: &[Document], embeddings: &[Vec<f32>]) -> Result<AddOutcome>;

    /// Return the `k` most similar documents to the query embedding, ordered
    /// by descending cosine similarity. Empty collection yields an empty vec.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Flush any buffered state. Backends that write on every `add` treat
    /// this as a no-op.
    async fn persist(&self) -> Result<()>;

    /// Reset the collection to empty, dropping any persisted state. A
    /// subsequent `add` starts with a fresh index (and a fresh dimension).
    async fn clear(&self) -> Result<()>;
}
