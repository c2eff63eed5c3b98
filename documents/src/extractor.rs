//! Directory-level document extraction into per-page text records.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{DocumentError, Result};
use crate::reader::{PageReader, PdfPageReader, TextPageReader};

/// The text of one document page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Raw page text as extracted.
    pub text: String,

    /// Document identifier (the file name).
    pub source: String,

    /// 1-based page number.
    pub page: usize,
}

/// A document that was skipped during extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDocument {
    /// Path of the document.
    pub path: PathBuf,

    /// Why it was skipped.
    pub reason: String,
}

/// Result of extracting a directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Pages with extractable text, grouped by document in file-name order.
    pub pages: Vec<PageRecord>,

    /// Number of documents read successfully.
    pub documents_read: usize,

    /// Documents that failed to read or parse.
    pub skipped: Vec<SkippedDocument>,
}

/// Reads every supported document directly inside a directory.
///
/// Traversal is non-recursive and visits files in file-name order so that
/// repeated extractions of the same directory produce identical output.
#[derive(Clone)]
pub struct DocumentExtractor {
    readers: Vec<Arc<dyn PageReader>>,
}

impl DocumentExtractor {
    /// Create an extractor with no readers.
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    /// Create an extractor that reads PDF documents.
    pub fn with_defaults() -> Self {
        Self::new().with_reader(PdfPageReader)
    }

    /// Create an extractor for a list of extensions (e.g. `["pdf", "txt"]`).
    pub fn for_extensions<S: AsRef<str>>(extensions: &[S]) -> Result<Self> {
        let mut extractor = Self::new();
        for ext in extensions {
            let ext = ext.as_ref().trim_start_matches('.').to_ascii_lowercase();
            if extractor.reader_for_extension(&ext).is_some() {
                continue;
            }
            extractor = match ext.as_str() {
                "pdf" => extractor.with_reader(PdfPageReader),
                "txt" => extractor.with_reader(TextPageReader),
                _ => return Err(DocumentError::UnsupportedFormat(ext)),
            };
        }
        Ok(extractor)
    }

    /// Register an additional page reader.
    pub fn with_reader(mut self, reader: impl PageReader + 'static) -> Self {
        self.readers.push(Arc::new(reader));
        self
    }

    fn reader_for_extension(&self, ext: &str) -> Option<&Arc<dyn PageReader>> {
        self.readers.iter().find(|r| r.extensions().contains(&ext))
    }

    fn reader_for(&self, path: &Path) -> Option<&Arc<dyn PageReader>> {
        self.readers.iter().find(|r| r.supports(path))
    }

    /// Extract all pages from the supported documents in `dir`.
    ///
    /// A missing directory yields an empty report. A document that fails to
    /// read is recorded in [`ExtractionReport::skipped`] and the remaining
    /// documents are still processed. Pages whose text is blank are dropped.
    pub async fn extract_dir(&self, dir: &Path) -> ExtractionReport {
        let mut report = ExtractionReport::default();

        if !dir.is_dir() {
            warn!("Directory {} not found.", dir.display());
            return report;
        }

        let files: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.into_path()),
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {e}", dir.display());
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();

        for path in files {
            let Some(reader) = self.reader_for(&path) else {
                debug!("Ignoring unsupported file {}", path.display());
                continue;
            };

            match reader.read_pages(&path).await {
                Ok(pages) => {
                    report.documents_read += 1;
                    let source = file_name(&path);
                    for (index, text) in pages.into_iter().enumerate() {
                        if text.trim().is_empty() {
                            continue;
                        }
                        report.pages.push(PageRecord {
                            text,
                            source: source.clone(),
                            page: index + 1,
                        });
                    }
                }
                Err(e) => {
                    warn!("Error reading {}: {e}", path.display());
                    report.skipped.push(SkippedDocument {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Extracted {} pages from {} documents ({} skipped)",
            report.pages.len(),
            report.documents_read,
            report.skipped.len()
        );
        report
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
