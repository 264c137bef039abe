//! Filesystem-persisted vector backend.
//!
//! One collection maps to four files under the storage directory:
//!
//! | file | contents |
//! |---|---|
//! | `<name>.index` | opaque serialized [`FlatIndex`] |
//! | `<name>.ids.json` | ordered JSON array of document ids |
//! | `<name>.texts.json` | ordered JSON array of document texts |
//! | `<name>.metas.json` | ordered JSON array of metadata objects |
//!
//! The index file is written via a temporary path and an atomic rename;
//! sidecars are whole-file overwrites. The pair is therefore not jointly
//! atomic: a crash between the two writes can leave the index ahead of the
//! sidecars. Persistence failures never fail an `add` — the in-memory append
//! has already happened and the degradation is reported in [`AddOutcome`].
//!
//! Single-process use only: nothing coordinates concurrent processes writing
//! the same collection files.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::{AddOutcome, VectorBackend};
use crate::document::{Document, SearchHit};
use crate::error::{RagError, Result};
use crate::flat::FlatIndex;

type Metadata = HashMap<String, serde_json::Value>;

/// Outcome of loading one persisted artifact.
///
/// Distinguishes "never written" from "written but unreadable" so the policy
/// for each (both currently degrade to empty) is a visible decision at the
/// call site rather than a silent catch-all.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    /// The file does not exist.
    Absent,
    /// The file exists but could not be read or parsed.
    Corrupt(String),
    /// The file was read and parsed.
    Loaded(T),
}

/// Resolved file paths for one collection.
#[derive(Debug, Clone)]
struct CollectionPaths {
    index: PathBuf,
    ids: PathBuf,
    texts: PathBuf,
    metas: PathBuf,
}

impl CollectionPaths {
    fn resolve(storage_dir: &Path, collection: &str) -> Self {
        Self {
            index: storage_dir.join(format!("{collection}.index")),
            ids: storage_dir.join(format!("{collection}.ids.json")),
            texts: storage_dir.join(format!("{collection}.texts.json")),
            metas: storage_dir.join(format!("{collection}.metas.json")),
        }
    }

    fn all(&self) -> [&Path; 4] {
        [&self.index, &self.ids, &self.texts, &self.metas]
    }
}

/// A vector backend persisting one collection to a directory on disk.
///
/// Opening never materializes files eagerly; the index is created on first
/// `add`, sized to that batch's dimension. If a later batch arrives with a
/// different dimension the index is rebuilt empty and all previously stored
/// documents are dropped (see [`AddOutcome::rebuilt_dimension`]).
#[derive(Debug)]
pub struct FsVectorStore {
    storage_dir: PathBuf,
    collection: String,
    paths: CollectionPaths,
}

impl FsVectorStore {
    /// Open (or lazily create) the collection `collection` under
    /// `storage_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Backend`] only if the storage directory cannot be
    /// created — the one condition with no possible degraded mode. Absent
    /// collection files are not an error.
    pub fn open_or_create(
        storage_dir: impl Into<PathBuf>,
        collection: impl Into<String>,
    ) -> Result<Self> {
        let storage_dir = storage_dir.into();
        let collection = collection.into();
        fs::create_dir_all(&storage_dir).map_err(|e| RagError::Backend {
            backend: "fs".into(),
            message: format!("cannot create storage dir {}: {e}", storage_dir.display()),
        })?;
        let paths = CollectionPaths::resolve(&storage_dir, &collection);
        Ok(Self { storage_dir, collection, paths })
    }

    /// The storage directory this store writes under.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// The collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn load_index(&self) -> LoadOutcome<FlatIndex> {
        match fs::read(&self.paths.index) {
            Ok(bytes) => match FlatIndex::from_bytes(&bytes) {
                Ok(idx) => LoadOutcome::Loaded(idx),
                Err(e) => LoadOutcome::Corrupt(e.to_string()),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => LoadOutcome::Absent,
            Err(e) => LoadOutcome::Corrupt(e.to_string()),
        }
    }

    fn load_sidecar<T: DeserializeOwned>(&self, path: &Path) -> LoadOutcome<Vec<T>> {
        match fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(items) => LoadOutcome::Loaded(items),
                Err(e) => LoadOutcome::Corrupt(e.to_string()),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => LoadOutcome::Absent,
            Err(e) => LoadOutcome::Corrupt(e.to_string()),
        }
    }

    /// Degrade a sidecar load to an empty sequence, warning on corruption.
    fn sidecar_or_empty<T: DeserializeOwned>(&self, path: &Path) -> Vec<T> {
        match self.load_sidecar(path) {
            LoadOutcome::Loaded(items) => items,
            LoadOutcome::Absent => Vec::new(),
            LoadOutcome::Corrupt(reason) => {
                warn!(
                    collection = %self.collection,
                    file = %path.display(),
                    %reason,
                    "sidecar unreadable, treating as empty"
                );
                Vec::new()
            }
        }
    }

    fn write_index(&self, index: &FlatIndex) -> std::io::Result<()> {
        let bytes = index
            .to_bytes()
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e.to_string()))?;
        let tmp = self.storage_dir.join(format!("{}.index.tmp", self.collection));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.paths.index)
    }

    fn write_sidecar<T: Serialize>(&self, path: &Path, items: &[T]) -> std::io::Result<()> {
        let bytes = serde_json::to_vec(items)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e.to_string()))?;
        fs::write(path, bytes)
    }
}

/// L2-normalize a vector, clamping a zero norm to 1.0 (an all-zero vector
/// stays all-zero rather than producing NaNs).
fn normalize_clamped(vector: &[f32]) -> Vec<f32> {
    let mut norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        norm = 1.0;
    }
    vector.iter().map(|x| x / norm).collect()
}

#[async_trait]
impl VectorBackend for FsVectorStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    async fn add(&self, docs: &[Document], embeddings: &[Vec<f32>]) -> Result<AddOutcome> {
        if docs.is_empty() {
            return Ok(AddOutcome::default());
        }
        if docs.len() != embeddings.len() {
            return Err(RagError::Backend {
                backend: "fs".into(),
                message: format!(
                    "{} documents but {} embeddings",
                    docs.len(),
                    embeddings.len()
                ),
            });
        }

        let mut outcome = AddOutcome { appended: docs.len(), ..AddOutcome::default() };
        let dim = embeddings[0].len();

        let index = match self.load_index() {
            LoadOutcome::Loaded(idx) => Some(idx),
            LoadOutcome::Absent => None,
            LoadOutcome::Corrupt(reason) => {
                warn!(
                    collection = %self.collection,
                    %reason,
                    "index unreadable, rebuilding empty"
                );
                outcome.dropped_corrupt_index = true;
                None
            }
        };

        let mut ids: Vec<String> = self.sidecar_or_empty(&self.paths.ids);
        let mut texts: Vec<String> = self.sidecar_or_empty(&self.paths.texts);
        let mut metas: Vec<Metadata> = self.sidecar_or_empty(&self.paths.metas);

        let mut index = match index {
            Some(idx) if idx.dim() == dim => idx,
            Some(idx) => {
                // Dimension changed: the index is rebuilt empty and the
                // sidecars are reset with it, dropping every previously
                // stored document in this collection.
                warn!(
                    collection = %self.collection,
                    old_dim = idx.dim(),
                    new_dim = dim,
                    dropped = idx.len(),
                    "embedding dimension changed, rebuilding collection empty"
                );
                outcome.rebuilt_dimension = Some((idx.dim(), dim));
                ids.clear();
                texts.clear();
                metas.clear();
                FlatIndex::new(dim)
            }
            None => {
                // Starting a fresh index while sidecar entries survive (a
                // dropped corrupt index, or an index file deleted out from
                // under us) would map new rows onto stale documents. Row i
                // of the index must always describe entry i of every
                // sidecar, so the sidecars reset with the index.
                if !ids.is_empty() || !texts.is_empty() || !metas.is_empty() {
                    warn!(
                        collection = %self.collection,
                        stale = ids.len(),
                        "index missing but sidecars present, resetting collection"
                    );
                    ids.clear();
                    texts.clear();
                    metas.clear();
                }
                FlatIndex::new(dim)
            }
        };

        let normalized: Vec<Vec<f32>> =
            embeddings.iter().map(|row| normalize_clamped(row)).collect();
        index.append(&normalized);
        for doc in docs {
            ids.push(doc.id.clone());
            texts.push(doc.text.clone());
            metas.push(doc.metadata.clone());
        }

        // Index first (tmp + atomic rename), then sidecar overwrites.
        let persisted = self
            .write_index(&index)
            .and_then(|()| self.write_sidecar(&self.paths.ids, &ids))
            .and_then(|()| self.write_sidecar(&self.paths.texts, &texts))
            .and_then(|()| self.write_sidecar(&self.paths.metas, &metas));
        if let Err(e) = persisted {
            outcome.persist_error = Some(e.to_string());
        }

        debug!(
            collection = %self.collection,
            appended = outcome.appended,
            total = index.len(),
            durable = outcome.is_durable(),
            "added documents"
        );
        Ok(outcome)
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let index = match self.load_index() {
            LoadOutcome::Loaded(idx) => idx,
            LoadOutcome::Absent => return Ok(Vec::new()),
            LoadOutcome::Corrupt(reason) => {
                warn!(
                    collection = %self.collection,
                    %reason,
                    "index unreadable, returning no results"
                );
                return Ok(Vec::new());
            }
        };
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = self.sidecar_or_empty(&self.paths.ids);
        let texts: Vec<String> = self.sidecar_or_empty(&self.paths.texts);
        let metas: Vec<Metadata> = self.sidecar_or_empty(&self.paths.metas);

        let query = normalize_clamped(embedding);
        let mut hits = Vec::new();
        for (pos, score) in index.search(&query, k) {
            if pos < 0 {
                continue;
            }
            let pos = pos as usize;
            let (Some(id), Some(text)) = (ids.get(pos), texts.get(pos)) else {
                // Sidecars shorter than the index means a torn write; skip
                // rather than fabricate a result.
                continue;
            };
            hits.push(SearchHit {
                id: id.clone(),
                text: text.clone(),
                metadata: metas.get(pos).cloned().unwrap_or_default(),
                score,
            });
        }
        Ok(hits)
    }

    async fn persist(&self) -> Result<()> {
        // Every add already writes through; nothing is buffered.
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        for path in self.paths.all() {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(
                        collection = %self.collection,
                        file = %path.display(),
                        error = %e,
                        "failed to remove collection file"
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_deterministic_per_collection() {
        let paths = CollectionPaths::resolve(Path::new("/data"), "crew_rag");
        assert_eq!(paths.index, Path::new("/data/crew_rag.index"));
        assert_eq!(paths.ids, Path::new("/data/crew_rag.ids.json"));
        assert_eq!(paths.texts, Path::new("/data/crew_rag.texts.json"));
        assert_eq!(paths.metas, Path::new("/data/crew_rag.metas.json"));
    }

    #[test]
    fn normalize_clamps_zero_norm() {
        assert_eq!(normalize_clamped(&[0.0, 0.0]), vec![0.0, 0.0]);
        let n = normalize_clamped(&[3.0, 4.0]);
        assert!((n[0] - 0.6).abs() < 1e-6);
        assert!((n[1] - 0.8).abs() < 1e-6);
    }
}
