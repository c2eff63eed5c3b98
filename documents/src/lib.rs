//! # Documents
//!
//! Reads paginated source documents from a directory and cuts their pages
//! into overlapping text windows for embedding.
//!
//! ```text
//! docs dir ──► DocumentExtractor ──► PageRecord* ──► Chunker ──► Chunk*
//!                    │
//!                    ▼
//!              PageReader (pdf, txt)
//! ```

pub mod chunker;
pub mod error;
pub mod extractor;
pub mod reader;

pub use chunker::{Chunk, Chunker, ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use error::{DocumentError, Result};
pub use extractor::{DocumentExtractor, ExtractionReport, PageRecord, SkippedDocument};
pub use reader::{PageReader, PdfPageReader, TextPageReader};
