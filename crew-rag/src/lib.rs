//! Retrieval layer for crewkit agents.
//!
//! This crate glues an embedding capability to a vector-similarity store
//! behind one uniform API, the [`RagManager`]. Two interchangeable backends
//! implement the [`VectorBackend`] contract:
//!
//! - [`FsVectorStore`] — a filesystem-persisted flat inner-product index with
//!   positionally aligned id/text/metadata sidecar files per collection.
//! - [`MemoryVectorStore`] — the same contract held entirely in memory, used
//!   when persistent storage cannot be opened.
//!
//! The backend is resolved once, at construction: either injected directly
//! via [`RagManager::with_backend`] or chosen by [`RagManager::open`], which
//! probes the filesystem backend a single time and falls back to memory for
//! the lifetime of the manager.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crew_rag::{Document, RagManager};
//!
//! let manager = RagManager::open(Arc::new(embedder), "/var/lib/crewkit", "crew_rag");
//! manager.add_documents(docs).await?;
//! let hits = manager.search("fraud pattern", 5).await?;
//! ```

pub mod backend;
pub mod document;
pub mod embedding;
pub mod error;
pub mod flat;
pub mod fsstore;
pub mod inmemory;
pub mod manager;
#[cfg(feature = "openai")]
pub mod openai;

pub use backend::{AddOutcome, VectorBackend};
pub use document::{Document, SearchHit};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use flat::FlatIndex;
pub use fsstore::FsVectorStore;
pub use inmemory::MemoryVectorStore;
pub use manager::RagManager;
#[cfg(feature = "openai")]
pub use openai::OpenAiEmbedder;
