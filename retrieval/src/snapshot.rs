//! Immutable chunk store + vector index pairs.

use std::collections::BTreeSet;

use clearpath_documents::Chunk;
use clearpath_embeddings::{Embedding, SearchHit, VectorIndex};

use crate::error::{Result, RetrievalError};

/// A complete, read-only index: `chunks[i]` is described by vector `i`.
///
/// The only constructor takes both halves at once and checks their lengths,
/// so a snapshot is never half populated.
#[derive(Debug)]
pub struct IndexSnapshot {
    chunks: Vec<Chunk>,
    index: VectorIndex,
}

impl IndexSnapshot {
    /// Pair chunks with their normalized vectors, in the same order.
    pub fn new(chunks: Vec<Chunk>, vectors: &[Embedding]) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(RetrievalError::InconsistentIndex {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        let mut index = VectorIndex::with_capacity(dimension, vectors.len());
        index.add(vectors)?;

        Ok(Self { chunks, index })
    }

    /// Stored chunks in index order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of chunks (and vectors).
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the snapshot holds nothing.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimension, if any vectors are stored.
    pub fn dimension(&self) -> Option<usize> {
        self.index.dimension().filter(|_| !self.index.is_empty())
    }

    /// The stored vector for the chunk at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.index.get(position)
    }

    /// Number of distinct source documents.
    pub fn document_count(&self) -> usize {
        self.chunks
            .iter()
            .map(|c| c.source.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Top-k search, paired with the chunk at each returned position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(&Chunk, SearchHit)>> {
        let hits = self.index.search(query, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| self.chunks.get(hit.position).map(|chunk| (chunk, hit)))
            .collect())
    }
}
