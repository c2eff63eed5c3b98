//! Flat inner-product index over normalized embeddings.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::dot_unchecked;

/// A single search hit: the position of a stored vector and its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Position of the vector in insertion order.
    pub position: usize,

    /// Dot product against the query.
    pub score: f32,
}

/// An append-only collection of vectors searched by exhaustive dot product.
///
/// Vectors are stored row-major in one contiguous buffer. Position `i` is the
/// `i`-th vector ever added; nothing is removed or reordered, so callers can
/// keep a parallel sequence keyed by position. Callers are expected to pass
/// L2-normalized vectors so that scores are cosine similarities.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    /// Row-major vector data, `len * dimension` floats.
    data: Vec<f32>,

    /// Dimension fixed by the first non-empty `add`.
    dimension: Option<usize>,

    /// Number of stored vectors.
    len: usize,
}

impl VectorIndex {
    /// Create an empty index. The dimension is taken from the first vector added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with a fixed dimension and room for `capacity` vectors.
    pub fn with_capacity(dimension: usize, capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(dimension * capacity),
            dimension: Some(dimension),
            len: 0,
        }
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dimension of stored vectors, if known.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Get the vector stored at `position`.
    pub fn get(&self, position: usize) -> Option<&[f32]> {
        let dim = self.dimension?;
        if position >= self.len {
            return None;
        }
        Some(&self.data[position * dim..(position + 1) * dim])
    }

    /// Append vectors, assigning consecutive positions from the current size.
    ///
    /// The whole batch is validated before anything is appended: if any
    /// vector has the wrong dimension the index is left untouched.
    pub fn add(&mut self, vectors: &[Embedding]) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };

        let dim = self.dimension.unwrap_or(first.len());
        if dim == 0 {
            return Err(EmbeddingError::EmptyEmbedding);
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }

        self.data.reserve(vectors.len() * dim);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        self.dimension = Some(dim);
        self.len += vectors.len();

        debug!("Added {} vectors to index (total {})", vectors.len(), self.len);
        Ok(())
    }

    /// Return the `k` stored positions with the highest dot product against `query`.
    ///
    /// Results are ordered by descending score; equal scores keep ascending
    /// position order. An empty index yields no hits, and fewer than `k`
    /// stored vectors yields all of them.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let Some(dim) = self.dimension else {
            return Ok(Vec::new());
        };
        if self.len == 0 || dim == 0 || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != dim {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dim,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(dim)
            .enumerate()
            .map(|(position, vector)| SearchHit {
                position,
                score: dot_unchecked(query, vector),
            })
            .collect();

        // Stable sort keeps ascending positions among equal scores.
        hits.sort_by_key(|hit| Reverse(OrderedFloat(hit.score)));
        hits.truncate(k);

        Ok(hits)
    }
}
