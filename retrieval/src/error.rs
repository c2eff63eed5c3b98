//! Error types for the retrieval pipeline.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval pipeline.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Document extraction or chunking error.
    #[error("document error: {0}")]
    Document(#[from] clearpath_documents::DocumentError),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] clearpath_embeddings::EmbeddingError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Chunk store and vector index disagree in length.
    #[error("inconsistent index: {chunks} chunks but {vectors} vectors")]
    InconsistentIndex { chunks: usize, vectors: usize },

    /// The build did not finish within the configured timeout.
    #[error("index build timed out after {secs}s")]
    BuildTimedOut { secs: u64 },
}
