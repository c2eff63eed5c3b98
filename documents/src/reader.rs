//! Page readers for supported document formats.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{DocumentError, Result};

/// Reads a paginated document into one text string per page.
#[async_trait]
pub trait PageReader: Send + Sync {
    /// Lower-case file extensions this reader handles, without the dot.
    fn extensions(&self) -> &[&'static str];

    /// Read the document at `path`, returning page texts in page order.
    ///
    /// Pages without extractable text are returned as empty strings so that
    /// page numbers stay aligned with the source document.
    async fn read_pages(&self, path: &Path) -> Result<Vec<String>>;

    /// Whether this reader handles `path`, by case-insensitive extension.
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }
}

/// PDF reader backed by `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfPageReader;

#[async_trait]
impl PageReader for PdfPageReader {
    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    async fn read_pages(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = tokio::fs::read(path).await?;

        // The parser is CPU-bound and may panic on malformed input; keep both
        // off the async workers and contained to this one document.
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| DocumentError::Parse {
            path: path.to_path_buf(),
            message: format!("PDF parser aborted: {e}"),
        })?
        .map_err(|e| DocumentError::Parse {
            path: path.to_path_buf(),
            message: format!("PDF extraction error: {e}"),
        })?;

        debug!("Read {} pages from {}", pages.len(), path.display());
        Ok(pages)
    }
}

/// Plain-text reader; pages are separated by form feed characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPageReader;

/// Page separator used by plain-text documents.
pub const PAGE_BREAK: char = '\u{0c}';

#[async_trait]
impl PageReader for TextPageReader {
    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    async fn read_pages(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = tokio::fs::read(path).await?;
        let content = String::from_utf8(bytes).map_err(|e| DocumentError::Parse {
            path: path.to_path_buf(),
            message: format!("not valid UTF-8: {e}"),
        })?;

        Ok(content.split(PAGE_BREAK).map(str::to_string).collect())
    }
}
