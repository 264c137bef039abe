//! Manager-level tests: embed-then-dispatch, backend fallback, clear.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use crew_rag::{Document, EmbeddingProvider, MemoryVectorStore, RagManager, Result};
use serde_json::json;
use tempfile::TempDir;

/// Deterministic low-dimensional embedder: same text, same vector.
struct StubEmbedder {
    batch_calls: AtomicUsize,
}

impl StubEmbedder {
    fn new() -> Self {
        Self { batch_calls: AtomicUsize::new(0) }
    }

    fn embed_text(text: &str) -> Vec<f32> {
        let s: u32 = text.chars().map(|c| c as u32).sum();
        vec![(s % 13) as f32, (s % 7) as f32, (s % 3) as f32]
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::embed_text(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        3
    }
}

fn docs() -> Vec<Document> {
    vec![
        Document::new("id1", "fraud pattern A").with_metadata("tag", json!("fraud")),
        Document::new("id2", "normal activity").with_metadata("tag", json!("ok")),
        Document::new("id3", "fraud pattern B").with_metadata("tag", json!("fraud")),
    ]
}

#[tokio::test]
async fn add_and_search_round_trip_on_fs_backend() {
    let dir = TempDir::new().unwrap();
    let manager = RagManager::open(Arc::new(StubEmbedder::new()), dir.path(), "testcol");
    assert_eq!(manager.backend_name(), "fs");

    manager.add_documents(docs()).await.unwrap();
    let hits = manager.search("fraud pattern A", 2).await.unwrap();
    assert!(hits.len() <= 2);
    assert_eq!(hits[0].id, "id1");
    assert!((hits[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn add_documents_embeds_in_one_batch_call() {
    let embedder = Arc::new(StubEmbedder::new());
    let manager =
        RagManager::with_backend(embedder.clone(), Arc::new(MemoryVectorStore::new()));

    manager.add_documents(docs()).await.unwrap();
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);

    manager.search("fraud pattern", 5).await.unwrap();
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_add_is_a_noop() {
    let embedder = Arc::new(StubEmbedder::new());
    let manager =
        RagManager::with_backend(embedder.clone(), Arc::new(MemoryVectorStore::new()));

    manager.add_documents(Vec::new()).await.unwrap();
    // The embedder is never invoked for an empty batch.
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn search_on_fresh_manager_is_empty() {
    let manager = RagManager::with_backend(
        Arc::new(StubEmbedder::new()),
        Arc::new(MemoryVectorStore::new()),
    );
    assert!(manager.search("anything", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn clear_resets_fs_collection_for_reuse() {
    let dir = TempDir::new().unwrap();
    let manager = RagManager::open(Arc::new(StubEmbedder::new()), dir.path(), "testcol");

    manager.add_documents(docs()).await.unwrap();
    manager.clear().await.unwrap();
    assert!(manager.search("fraud pattern A", 5).await.unwrap().is_empty());

    // The collection is usable again after a clear.
    manager.add_documents(vec![Document::new("id9", "fresh start")]).await.unwrap();
    let hits = manager.search("fresh start", 1).await.unwrap();
    assert_eq!(hits[0].id, "id9");
}

#[tokio::test]
async fn persist_is_always_safe_to_call() {
    let dir = TempDir::new().unwrap();
    let manager = RagManager::open(Arc::new(StubEmbedder::new()), dir.path(), "testcol");
    manager.persist().await.unwrap();
    manager.add_documents(docs()).await.unwrap();
    manager.persist().await.unwrap();
}

#[tokio::test]
async fn results_survive_reopening_the_collection() {
    let dir = TempDir::new().unwrap();
    {
        let manager = RagManager::open(Arc::new(StubEmbedder::new()), dir.path(), "testcol");
        manager.add_documents(docs()).await.unwrap();
    }
    let reopened = RagManager::open(Arc::new(StubEmbedder::new()), dir.path(), "testcol");
    let hits = reopened.search("normal activity", 1).await.unwrap();
    assert_eq!(hits[0].id, "id2");
}

mod prop_memory_search_ordering {
    use super::*;
    use crew_rag::backend::VectorBackend;
    use proptest::prelude::*;

    const DIM: usize = 8;

    fn arb_embedding() -> impl Strategy<Value = Vec<f32>> {
        proptest::collection::vec(-1.0f32..1.0f32, DIM).prop_filter(
            "non-zero embedding",
            |v| v.iter().map(|x| x * x).sum::<f32>().sqrt() > 1e-3,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Search over the in-memory backend returns at most k results,
        /// ordered by descending cosine similarity.
        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            embeddings in proptest::collection::vec(arb_embedding(), 1..20),
            query in arb_embedding(),
            k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let hits = rt.block_on(async {
                let store = MemoryVectorStore::new();
                let docs: Vec<Document> = (0..embeddings.len())
                    .map(|i| Document::new(format!("doc{i}"), format!("text {i}")))
                    .collect();
                store.add(&docs, &embeddings).await.unwrap();
                store.query(&query, k).await.unwrap()
            });

            prop_assert!(hits.len() <= k);
            prop_assert!(hits.len() <= embeddings.len());
            for window in hits.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}
