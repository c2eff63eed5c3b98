//! Retrieval pipeline: index builds and top-k queries.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use clearpath_documents::{Chunker, DocumentExtractor, SkippedDocument};
use clearpath_embeddings::{
    Embedding, EmbeddingProvider, embed_batch_normalized, embed_normalized,
};

use crate::config::{ChunkingConfig, EmbeddingConfig, RetrievalConfig};
use crate::error::{Result, RetrievalError};
use crate::snapshot::IndexSnapshot;

/// One retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Chunk text.
    pub text: String,

    /// Source document identifier.
    pub document: String,

    /// 1-based page number in the source document.
    pub page: usize,

    /// Raw cosine similarity (dot product of unit vectors).
    pub relevance_score: f32,
}

/// Build progress, published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndexStatus {
    /// No build has been requested yet.
    NotStarted,
    /// A build is running. Queries see the previous index, if any.
    Building,
    /// An index is active.
    Ready { chunks: usize },
    /// The last build found no text and no index was ever built.
    Empty,
    /// The last build failed. A previously active index stays active.
    Failed { message: String },
}

impl IndexStatus {
    /// Whether no build is pending or running.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::NotStarted | Self::Building)
    }
}

/// Summary of one `build_index` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    /// Pages with extractable text.
    pub pages: usize,

    /// Documents read successfully.
    pub documents_read: usize,

    /// Documents skipped because they could not be read.
    pub documents_skipped: Vec<SkippedDocument>,

    /// Chunks produced.
    pub chunks: usize,

    /// Embedding dimension of the new index.
    pub dimension: Option<usize>,

    /// Whether a new index replaced the active one.
    pub committed: bool,
}

/// Point-in-time statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Whether an index is active.
    pub indexed: bool,

    /// Chunks in the active index.
    pub chunks: usize,

    /// Distinct documents in the active index.
    pub documents: usize,

    /// Vector dimension of the active index.
    pub dimension: Option<usize>,
}

/// Extraction → chunking → embedding → indexing at build time, and
/// embedding → search → result assembly at query time.
///
/// The active index is an `Arc<IndexSnapshot>` replaced in a single write
/// once a build has fully completed. Queries clone the `Arc` and search
/// without holding the lock, so a query sees either the old index or the
/// new one. Builds are serialized.
pub struct RetrievalPipeline {
    /// Configuration.
    config: RetrievalConfig,

    /// Document reader.
    extractor: DocumentExtractor,

    /// Window splitter.
    chunker: Chunker,

    /// Embedding provider shared by builds and queries.
    provider: Arc<dyn EmbeddingProvider>,

    /// Currently active index.
    active: RwLock<Option<Arc<IndexSnapshot>>>,

    /// Held for the duration of a build.
    build_lock: Mutex<()>,

    /// Build status.
    status: watch::Sender<IndexStatus>,
}

impl RetrievalPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> RetrievalPipelineBuilder {
        RetrievalPipelineBuilder::new()
    }

    /// Create a pipeline using the provider named in the configuration.
    pub fn new(config: RetrievalConfig) -> Result<Self> {
        let provider = config.embedding.build_provider();
        Self::with_provider(config, provider)
    }

    /// Create a pipeline with an explicit embedding provider.
    ///
    /// The configuration is validated here, before any extraction work.
    pub fn with_provider(
        config: RetrievalConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let extractor = DocumentExtractor::for_extensions(config.extensions.as_slice())?;
        let chunker = Chunker::new(config.chunking.as_chunker_config())?;
        let (status, _) = watch::channel(IndexStatus::NotStarted);

        info!(
            "Retrieval pipeline over {} using {} embeddings",
            config.docs_dir.display(),
            provider.name()
        );

        Ok(Self {
            config,
            extractor,
            chunker,
            provider,
            active: RwLock::new(None),
            build_lock: Mutex::new(()),
            status,
        })
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Whether an index is active and queries can return results.
    pub async fn is_indexed(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// Current build status.
    pub fn status(&self) -> IndexStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to build status changes.
    pub fn subscribe(&self) -> watch::Receiver<IndexStatus> {
        self.status.subscribe()
    }

    /// Wait until no build is running, then return the status.
    ///
    /// Returns `NotStarted` at once if no build has been requested.
    pub async fn wait_until_settled(&self) -> IndexStatus {
        let mut rx = self.status.subscribe();
        let settled = match rx.wait_for(|s| *s != IndexStatus::Building).await {
            Ok(status) => (*status).clone(),
            Err(_) => self.status(),
        };
        settled
    }

    /// The active snapshot, if any.
    pub async fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.active.read().await.clone()
    }

    /// Statistics about the active index.
    pub async fn stats(&self) -> PipelineStats {
        match self.snapshot().await {
            Some(snapshot) => PipelineStats {
                indexed: true,
                chunks: snapshot.len(),
                documents: snapshot.document_count(),
                dimension: snapshot.dimension(),
            },
            None => PipelineStats {
                indexed: false,
                chunks: 0,
                documents: 0,
                dimension: None,
            },
        }
    }

    /// Rebuild the index from the documents directory.
    ///
    /// The new index is assembled off to the side and swapped in only when
    /// complete. If the directory yields no text, the current state is kept
    /// (an unbuilt pipeline stays unbuilt) and `Ok` is returned. Embedding
    /// failures and timeouts return `Err` and leave the active index as it was.
    pub async fn build_index(&self) -> Result<BuildReport> {
        let _guard = self.build_lock.lock().await;
        self.status.send_replace(IndexStatus::Building);

        let outcome = match self.config.build.timeout() {
            Some(limit) => tokio::time::timeout(limit, self.assemble())
                .await
                .unwrap_or_else(|_| {
                    Err(RetrievalError::BuildTimedOut {
                        secs: limit.as_secs(),
                    })
                }),
            None => self.assemble().await,
        };

        match outcome {
            Ok((mut report, Some(snapshot))) => {
                let chunks = snapshot.len();
                *self.active.write().await = Some(Arc::new(snapshot));
                report.committed = true;
                self.status.send_replace(IndexStatus::Ready { chunks });
                info!("Index built successfully with {chunks} chunks.");
                Ok(report)
            }
            Ok((report, None)) => {
                let status = match self.snapshot().await {
                    Some(previous) => IndexStatus::Ready {
                        chunks: previous.len(),
                    },
                    None => IndexStatus::Empty,
                };
                self.status.send_replace(status);
                Ok(report)
            }
            Err(e) => {
                error!("Index build failed: {e}");
                self.status.send_replace(IndexStatus::Failed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Run `build_index` on a background task.
    ///
    /// Queries issued before it finishes see the previous state; use
    /// [`wait_until_settled`](Self::wait_until_settled) to await readiness.
    pub fn spawn_build(self: &Arc<Self>) -> JoinHandle<Result<BuildReport>> {
        let pipeline = Arc::clone(self);
        self.status.send_replace(IndexStatus::Building);
        tokio::spawn(async move { pipeline.build_index().await })
    }

    /// Extract, chunk and embed into a new snapshot without touching the
    /// active one.
    async fn assemble(&self) -> Result<(BuildReport, Option<IndexSnapshot>)> {
        info!("Extracting text from {}...", self.config.docs_dir.display());
        let extraction = self.extractor.extract_dir(&self.config.docs_dir).await;

        let mut report = BuildReport {
            pages: extraction.pages.len(),
            documents_read: extraction.documents_read,
            documents_skipped: extraction.skipped,
            ..BuildReport::default()
        };

        if extraction.pages.is_empty() {
            info!("No text data found. Index will be empty.");
            return Ok((report, None));
        }

        info!("Chunking text...");
        let chunks = self.chunker.chunk_pages(&extraction.pages);
        report.chunks = chunks.len();
        if chunks.is_empty() {
            info!("No chunks produced. Index will be empty.");
            return Ok((report, None));
        }

        info!("Generated {} chunks. Embedding...", chunks.len());
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_all(&texts).await?;

        let snapshot = IndexSnapshot::new(chunks, &vectors)?;
        report.dimension = snapshot.dimension();
        Ok((report, Some(snapshot)))
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let batch_size = self.config.embedding.batch_size;
        let mut vectors = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(batch_size).enumerate() {
            debug!("Embedding batch {} ({} texts)", i + 1, batch.len());
            vectors.extend(embed_batch_normalized(self.provider.as_ref(), batch).await?);
        }

        Ok(vectors)
    }

    /// Retrieve the `top_k` chunks most similar to `query`.
    ///
    /// Returns an empty list when no index is active. Results are in
    /// descending score order with ties broken by index position.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        let Some(snapshot) = self.snapshot().await else {
            return Ok(Vec::new());
        };
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = embed_normalized(self.provider.as_ref(), query).await?;
        let hits = snapshot.search(&query_vector, top_k)?;

        debug!("Retrieved {} chunks for query", hits.len());
        Ok(hits
            .into_iter()
            .map(|(chunk, hit)| RetrievalResult {
                text: chunk.text.clone(),
                document: chunk.source.clone(),
                page: chunk.page,
                relevance_score: hit.score,
            })
            .collect())
    }

    /// Retrieve using the configured default `top_k`.
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        self.retrieve(query, self.config.query.top_k).await
    }
}

/// Builder for a retrieval pipeline.
pub struct RetrievalPipelineBuilder {
    config: RetrievalConfig,
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl RetrievalPipelineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: RetrievalConfig::default(),
            provider: None,
        }
    }

    /// Start from an existing configuration.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the documents directory.
    pub fn with_docs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.docs_dir = dir.into();
        self
    }

    /// Set the document formats to read.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_extensions(extensions);
        self
    }

    /// Set the window configuration.
    pub fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.config.chunking = ChunkingConfig {
            chunk_size,
            overlap,
        };
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.config.embedding = config;
        self
    }

    /// Use a specific embedding provider instead of the configured one.
    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Result<RetrievalPipeline> {
        match self.provider {
            Some(provider) => RetrievalPipeline::with_provider(self.config, provider),
            None => RetrievalPipeline::new(self.config),
        }
    }
}

impl Default for RetrievalPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
