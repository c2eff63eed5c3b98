//! # Embeddings
//!
//! This crate turns text into dense vectors and answers nearest-neighbor
//! queries over them for ClearPath document retrieval.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors through an
//!   [`EmbeddingProvider`] (offline hashing or an OpenAI-compatible API)
//! - **Normalization**: Every stored or compared vector is L2-normalized
//! - **Similarity Search**: Exhaustive inner-product top-k over a
//!   [`VectorIndex`] with deterministic tie-breaking
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► normalize ──► VectorIndex               │
//! │       │                                  │                      │
//! │       ▼                                  ▼                      │
//! │  Hashing/OpenAI                    SearchHit (position, score)  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod index;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use index::{SearchHit, VectorIndex};
pub use provider::{
    DEFAULT_HASHING_DIMENSION, EmbeddingProvider, HashingProvider, OpenAIProvider,
    embed_batch_normalized, embed_normalized,
};
pub use similarity::{dot_product, l2_norm, normalize, normalized};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
