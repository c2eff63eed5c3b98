//! # Retrieval Pipeline
//!
//! This crate builds an in-memory similarity index over a directory of
//! paginated documents and answers free-text top-k queries against it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Retrieval Pipeline                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  build_index():                                                 │
//! │  Extractor ──► Chunker ──► EmbeddingProvider ──► IndexSnapshot  │
//! │                                                        │        │
//! │                                          atomic swap   ▼        │
//! │                                              ┌──────────────┐   │
//! │  retrieve(query, k):                         │    active    │   │
//! │    EmbeddingProvider ──► search ◄────────────│   snapshot   │   │
//! │                             │                └──────────────┘   │
//! │                             ▼                                   │
//! │                     RetrievalResult*                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clearpath_retrieval::RetrievalPipeline;
//!
//! let pipeline = RetrievalPipeline::builder()
//!     .with_docs_dir("clearpath_docs")
//!     .build()?;
//!
//! pipeline.build_index().await?;
//! let results = pipeline.retrieve("How do I reset my password?", 3).await?;
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod snapshot;

pub use config::{
    BuildConfig, ChunkingConfig, EmbeddingConfig, EmbeddingProviderType, QueryConfig,
    RetrievalConfig,
};
pub use error::{Result, RetrievalError};
pub use pipeline::{
    BuildReport, IndexStatus, PipelineStats, RetrievalPipeline, RetrievalPipelineBuilder,
    RetrievalResult,
};
pub use snapshot::IndexSnapshot;

// Re-export from dependencies for convenience
pub use clearpath_documents::{Chunk, PageRecord};
pub use clearpath_embeddings::{EmbeddingProvider, HashingProvider, OpenAIProvider};
