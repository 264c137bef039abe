//! Exact nearest-neighbor search over a flat matrix of vectors.
//!
//! [`FlatIndex`] is the search capability the persisted backend delegates to:
//! construct by dimension, append rows, ask for the k entries with the
//! largest inner product against a query. Callers are responsible for
//! L2-normalizing rows if they want the inner product to equal cosine
//! similarity.

use serde::{Deserialize, Serialize};

/// Sentinel position returned for result slots beyond the number of stored
/// rows (a search for k neighbors always yields exactly k slots).
pub const INVALID_POS: i64 = -1;

/// A brute-force inner-product index over a dense row-major matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    /// The dimensionality of indexed vectors.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The number of rows currently indexed.
    pub fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    /// Whether the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append rows to the index. Every row must have length [`dim`](Self::dim).
    pub fn append(&mut self, rows: &[Vec<f32>]) {
        for row in rows {
            debug_assert_eq!(row.len(), self.dim, "row dimension mismatch");
            self.data.extend_from_slice(row);
        }
    }

    /// Return the k rows with the largest inner product against `query`,
    /// ordered by descending score.
    ///
    /// Always returns exactly `k` `(position, score)` pairs; slots beyond the
    /// number of stored rows carry [`INVALID_POS`] and a score of negative
    /// infinity.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(i64, f32)> {
        debug_assert_eq!(query.len(), self.dim, "query dimension mismatch");
        if self.dim == 0 || self.data.is_empty() {
            return vec![(INVALID_POS, f32::NEG_INFINITY); k];
        }

        let mut scored: Vec<(i64, f32)> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(pos, row)| {
                let dot: f32 = row.iter().zip(query.iter()).map(|(x, y)| x * y).sum();
                (pos as i64, dot)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        while scored.len() < k {
            scored.push((INVALID_POS, f32::NEG_INFINITY));
        }
        scored
    }

    /// Serialize the index to an opaque byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::error::EncodeError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
    }

    /// Deserialize an index from a buffer produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::error::DecodeError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard()).map(|(idx, _)| idx)
    }
}
