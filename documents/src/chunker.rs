//! Sliding-window chunking of page text.
//!
//! A page is cut into windows of `chunk_size` characters whose starts advance
//! by `chunk_size - overlap`. Sizes and offsets count Unicode scalar values,
//! never bytes, so a window never splits a code point.

use serde::{Deserialize, Serialize};

use crate::error::{DocumentError, Result};
use crate::extractor::PageRecord;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// A window of page text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Window text with surrounding whitespace trimmed. Never empty.
    pub text: String,

    /// Document identifier.
    pub source: String,

    /// 1-based page number.
    pub page: usize,

    /// Start of the window in the page, in characters.
    pub start: usize,

    /// End of the window in the page (exclusive), in characters.
    pub end: usize,
}

/// Window and overlap sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Window size in characters.
    pub chunk_size: usize,

    /// Characters shared by consecutive windows.
    pub overlap: usize,
}

impl ChunkerConfig {
    /// Create a config without validating it.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Check that windows advance: `chunk_size - overlap` must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.overlap >= self.chunk_size {
            return Err(DocumentError::InvalidChunking {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    /// Distance between consecutive window starts.
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap)
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

/// Splits page text into overlapping fixed-size windows.
///
/// Only constructible from a validated [`ChunkerConfig`].
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a chunker, rejecting configurations that would never advance.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The chunker's configuration.
    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Character ranges `[start, end)` of every window over a text of
    /// `len` characters.
    ///
    /// Window starts advance by `step` until they reach `len`, giving
    /// `ceil(len / step)` windows. Trailing windows that lie inside the
    /// previous one are still emitted.
    pub fn window_ranges(&self, len: usize) -> Vec<(usize, usize)> {
        let size = self.config.chunk_size;
        let step = self.config.step();

        let mut ranges = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + size).min(len);
            ranges.push((start, end));
            start += step;
        }
        ranges
    }

    /// Chunk one page. Windows that are blank after trimming are dropped.
    pub fn chunk_page(&self, page: &PageRecord) -> Vec<Chunk> {
        let text = page.text.as_str();
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        self.window_ranges(char_len)
            .into_iter()
            .filter_map(|(start, end)| {
                let window = text[boundaries[start]..boundaries[end]].trim();
                (!window.is_empty()).then(|| Chunk {
                    text: window.to_string(),
                    source: page.source.clone(),
                    page: page.page,
                    start,
                    end,
                })
            })
            .collect()
    }

    /// Chunk every page, preserving page order and window order within a page.
    pub fn chunk_pages(&self, pages: &[PageRecord]) -> Vec<Chunk> {
        pages.iter().flat_map(|page| self.chunk_page(page)).collect()
    }
}
