//! Behavior tests for the filesystem-persisted vector backend.

use std::collections::HashMap;
use std::fs;

use crew_rag::document::Document;
use crew_rag::flat::FlatIndex;
use crew_rag::fsstore::FsVectorStore;
use crew_rag::backend::VectorBackend;
use serde_json::json;
use tempfile::TempDir;

fn doc(id: &str, text: &str) -> Document {
    Document::new(id, text).with_metadata("tag", json!("test"))
}

fn open(dir: &TempDir) -> FsVectorStore {
    FsVectorStore::open_or_create(dir.path(), "testcol").unwrap()
}

#[tokio::test]
async fn stored_vector_is_its_own_nearest_neighbor() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let docs = vec![doc("id1", "fraud pattern A"), doc("id2", "normal activity")];
    // Raw, non-normalized embeddings; the store normalizes internally.
    let embeddings = vec![vec![3.0, 4.0, 0.0], vec![0.0, 1.0, 5.0]];
    store.add(&docs, &embeddings).await.unwrap();

    let hits = store.query(&[3.0, 4.0, 0.0], 2).await.unwrap();
    assert_eq!(hits[0].id, "id1");
    assert!((hits[0].score - 1.0).abs() < 1e-5, "self-similarity was {}", hits[0].score);
}

#[tokio::test]
async fn sequences_stay_positionally_aligned_across_adds() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    store
        .add(&[doc("a", "one"), doc("b", "two")], &[vec![1.0, 0.0], vec![0.0, 1.0]])
        .await
        .unwrap();
    store.add(&[doc("c", "three")], &[vec![1.0, 1.0]]).await.unwrap();

    let ids: Vec<String> =
        serde_json::from_slice(&fs::read(dir.path().join("testcol.ids.json")).unwrap()).unwrap();
    let texts: Vec<String> =
        serde_json::from_slice(&fs::read(dir.path().join("testcol.texts.json")).unwrap()).unwrap();
    let metas: Vec<HashMap<String, serde_json::Value>> =
        serde_json::from_slice(&fs::read(dir.path().join("testcol.metas.json")).unwrap()).unwrap();
    let index = FlatIndex::from_bytes(&fs::read(dir.path().join("testcol.index")).unwrap()).unwrap();

    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(texts, vec!["one", "two", "three"]);
    assert_eq!(metas.len(), 3);
    assert_eq!(index.len(), 3);
}

#[tokio::test]
async fn dimension_change_drops_previous_batch() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    store
        .add(&[doc("d1a", "old one"), doc("d1b", "old two")], &[vec![1.0, 0.0], vec![0.0, 1.0]])
        .await
        .unwrap();
    let outcome = store
        .add(&[doc("d2", "new")], &[vec![1.0, 0.0, 0.0]])
        .await
        .unwrap();

    assert_eq!(outcome.rebuilt_dimension, Some((2, 3)));

    // Only the dimension-3 batch survives; the old documents are gone.
    let hits = store.query(&[1.0, 0.0, 0.0], 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "d2");

    let ids: Vec<String> =
        serde_json::from_slice(&fs::read(dir.path().join("testcol.ids.json")).unwrap()).unwrap();
    assert_eq!(ids, vec!["d2"]);
}

#[tokio::test]
async fn query_is_idempotent_without_intervening_add() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store
        .add(
            &[doc("a", "one"), doc("b", "two"), doc("c", "three")],
            &[vec![1.0, 0.1], vec![0.2, 1.0], vec![0.9, 0.3]],
        )
        .await
        .unwrap();

    let first = store.query(&[1.0, 0.0], 2).await.unwrap();
    let second = store.query(&[1.0, 0.0], 2).await.unwrap();
    let first_ids: Vec<&str> = first.iter().map(|h| h.id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.score, b.score);
    }
}

#[tokio::test]
async fn query_on_absent_collection_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    assert!(store.query(&[1.0, 0.0], 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn query_with_k_larger_than_collection_skips_sentinels() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.add(&[doc("only", "one doc")], &[vec![1.0, 0.0]]).await.unwrap();

    let hits = store.query(&[1.0, 0.0], 10).await.unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn corrupt_index_is_discarded_not_fatal() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.add(&[doc("a", "one")], &[vec![1.0, 0.0]]).await.unwrap();

    fs::write(dir.path().join("testcol.index"), b"not an index").unwrap();

    // Query degrades to empty.
    assert!(store.query(&[1.0, 0.0], 5).await.unwrap().is_empty());

    // Add rebuilds from empty and reports the drop.
    let outcome = store.add(&[doc("b", "two")], &[vec![0.0, 1.0]]).await.unwrap();
    assert!(outcome.dropped_corrupt_index);
    let hits = store.query(&[0.0, 1.0], 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "b");
}

#[tokio::test]
async fn stale_sidecars_reset_when_index_file_is_gone() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store
        .add(&[doc("a", "one"), doc("b", "two")], &[vec![1.0, 0.0], vec![0.0, 1.0]])
        .await
        .unwrap();

    // The index disappears but the sidecars survive.
    fs::remove_file(dir.path().join("testcol.index")).unwrap();

    store.add(&[doc("c", "three")], &[vec![1.0, 1.0]]).await.unwrap();

    // Row 0 of the fresh index must describe "c", not a leftover entry.
    let hits = store.query(&[1.0, 1.0], 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "c");
    assert_eq!(hits[0].text, "three");

    let ids: Vec<String> =
        serde_json::from_slice(&fs::read(dir.path().join("testcol.ids.json")).unwrap()).unwrap();
    assert_eq!(ids, vec!["c"]);
}

#[tokio::test]
async fn clear_removes_collection_files() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.add(&[doc("a", "one")], &[vec![1.0, 0.0]]).await.unwrap();

    store.clear().await.unwrap();
    assert!(!dir.path().join("testcol.index").exists());
    assert!(!dir.path().join("testcol.ids.json").exists());
    assert!(store.query(&[1.0, 0.0], 5).await.unwrap().is_empty());

    // Clearing twice is fine; missing files are ignored.
    store.clear().await.unwrap();
}

#[tokio::test]
async fn zero_norm_embedding_stays_all_zero() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store
        .add(&[doc("z", "zero"), doc("u", "unit")], &[vec![0.0, 0.0], vec![1.0, 0.0]])
        .await
        .unwrap();

    let hits = store.query(&[1.0, 0.0], 2).await.unwrap();
    assert_eq!(hits[0].id, "u");
    assert_eq!(hits[1].id, "z");
    assert_eq!(hits[1].score, 0.0);
}
