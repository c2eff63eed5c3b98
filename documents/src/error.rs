//! Error types for document extraction and chunking.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors that can occur while reading or chunking documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Window/overlap combination that would never advance.
    #[error("invalid chunking: overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    /// No page reader exists for the requested file extension.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// A document could not be parsed.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
