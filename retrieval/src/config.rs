//! Configuration for the retrieval pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use clearpath_documents::{ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use clearpath_embeddings::{
    DEFAULT_HASHING_DIMENSION, EmbeddingProvider, HashingProvider, OpenAIProvider,
};

use crate::error::{Result, RetrievalError};

/// Configuration for the retrieval pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Directory holding the source documents.
    pub docs_dir: PathBuf,

    /// Document formats to read, by file extension.
    pub extensions: Vec<String>,

    /// Window configuration.
    pub chunking: ChunkingConfig,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Query configuration.
    pub query: QueryConfig,

    /// Build configuration.
    pub build: BuildConfig,
}

impl RetrievalConfig {
    /// Create a new configuration with default values.
    pub fn new(docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
            extensions: vec!["pdf".to_string()],
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            query: QueryConfig::default(),
            build: BuildConfig::default(),
        }
    }

    /// Set the document formats to read.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the chunking configuration.
    pub fn with_chunking(mut self, config: ChunkingConfig) -> Self {
        self.chunking = config;
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the default number of results per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.query.top_k = top_k;
        self
    }

    /// Set a build timeout.
    pub fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.build.timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// Check the configuration before any work starts.
    pub fn validate(&self) -> Result<()> {
        self.chunking
            .as_chunker_config()
            .validate()
            .map_err(|e| RetrievalError::Config(e.to_string()))?;

        if self.extensions.is_empty() {
            return Err(RetrievalError::Config(
                "at least one document extension is required".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(RetrievalError::Config(
                "embedding batch_size must be positive".to_string(),
            ));
        }
        if self.embedding.dimension == Some(0) {
            return Err(RetrievalError::Config(
                "embedding dimension must be positive".to_string(),
            ));
        }
        if self.build.timeout_secs == Some(0) {
            return Err(RetrievalError::Config(
                "build timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::new("clearpath_docs")
    }
}

/// Window sizes for chunking, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size.
    pub chunk_size: usize,

    /// Overlap between consecutive windows.
    pub overlap: usize,
}

impl ChunkingConfig {
    /// Convert into the chunker's own config type.
    pub fn as_chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig::new(self.chunk_size, self.overlap)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to use for embeddings.
    pub model: Option<String>,

    /// Base URL for HTTP providers.
    pub base_url: Option<String>,

    /// Output dimension.
    pub dimension: Option<usize>,

    /// Texts per embedding request during a build.
    pub batch_size: usize,
}

impl EmbeddingConfig {
    /// Construct the configured provider.
    pub fn build_provider(&self) -> Arc<dyn EmbeddingProvider> {
        match self.provider {
            EmbeddingProviderType::Hashing => Arc::new(HashingProvider::new(
                self.dimension.unwrap_or(DEFAULT_HASHING_DIMENSION),
            )),
            EmbeddingProviderType::OpenAI => {
                let mut provider = OpenAIProvider::new();
                if let Some(model) = &self.model {
                    provider = provider.with_model(model);
                }
                if let Some(url) = &self.base_url {
                    provider = provider.with_base_url(url);
                }
                if let Some(dims) = self.dimension {
                    provider = provider.with_dimensions(dims);
                }
                Arc::new(provider)
            }
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Hashing,
            model: None,
            base_url: None,
            dimension: None,
            batch_size: 64,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// Offline feature-hashing embeddings.
    Hashing,
    /// OpenAI-compatible embeddings API.
    #[serde(rename = "openai")]
    OpenAI,
}

/// Configuration for query processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of results returned by `retrieve_default`.
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Configuration for index builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Abandon a build that runs longer than this many seconds.
    pub timeout_secs: Option<u64>,
}

impl BuildConfig {
    /// The timeout as a duration, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
