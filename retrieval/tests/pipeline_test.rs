//! End-to-end tests for index builds and queries.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clearpath_embeddings::{
    Embedding, EmbeddingError, EmbeddingProvider, HashingProvider, l2_norm,
};
use clearpath_retrieval::{IndexStatus, RetrievalConfig, RetrievalError, RetrievalPipeline};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Wraps the hashing provider with switchable failures and an optional delay.
struct ControlledProvider {
    inner: HashingProvider,
    fail_batches: AtomicBool,
    fail_queries: AtomicBool,
    batch_delay: Duration,
    batch_calls: AtomicUsize,
}

impl ControlledProvider {
    fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(batch_delay: Duration) -> Self {
        Self {
            inner: HashingProvider::new(128),
            fail_batches: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
            batch_delay,
            batch_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for ControlledProvider {
    fn name(&self) -> &str {
        "controlled"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> clearpath_embeddings::Result<Embedding> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(EmbeddingError::ApiRequest("model offline".to_string()));
        }
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> clearpath_embeddings::Result<Vec<Embedding>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if !self.batch_delay.is_zero() {
            tokio::time::sleep(self.batch_delay).await;
        }
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(EmbeddingError::ApiRequest("model offline".to_string()));
        }
        self.inner.embed_batch(texts).await
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn pipeline_with(dir: &Path, provider: Arc<dyn EmbeddingProvider>) -> RetrievalPipeline {
    let config = RetrievalConfig::new(dir).with_extensions(["txt"]);
    RetrievalPipeline::with_provider(config, provider).unwrap()
}

/// 1200 characters of distinct sentences.
fn long_page() -> String {
    let mut text = String::new();
    let mut i = 0;
    while text.chars().count() < 1200 {
        text.push_str(&format!("Section {i} covers refund policy item {i}. "));
        i += 1;
    }
    text.chars().take(1200).collect()
}

#[tokio::test]
async fn test_single_page_example() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("manual.txt"), long_page()).unwrap();
    let pipeline = pipeline_with(dir.path(), Arc::new(ControlledProvider::new()));

    let report = pipeline.build_index().await.unwrap();
    assert_eq!(report.pages, 1);
    assert_eq!(report.chunks, 3);

    let snapshot = pipeline.snapshot().await.unwrap();
    let ranges: Vec<(usize, usize)> = snapshot.chunks().iter().map(|c| (c.start, c.end)).collect();
    assert_eq!(ranges, vec![(0, 500), (400, 900), (800, 1200)]);

    let results = pipeline.retrieve("refund policy", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].relevance_score >= results[1].relevance_score);
    for result in &results {
        assert_eq!(result.document, "manual.txt");
        assert_eq!(result.page, 1);
    }
}

#[tokio::test]
async fn test_empty_directory_example() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline_with(dir.path(), Arc::new(ControlledProvider::new()));

    pipeline.build_index().await.unwrap();

    assert!(!pipeline.is_indexed().await);
    assert!(pipeline.retrieve("anything", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_directory_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline_with(
        &dir.path().join("not-provisioned"),
        Arc::new(ControlledProvider::new()),
    );

    let report = pipeline.build_index().await.unwrap();
    assert!(!report.committed);
    assert_eq!(pipeline.status(), IndexStatus::Empty);
}

#[tokio::test]
async fn test_page_numbers_follow_source_pages() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("guide.txt"),
        "Cover page\u{0c}\u{0c}Shipping takes five business days.",
    )
    .unwrap();
    let pipeline = pipeline_with(dir.path(), Arc::new(ControlledProvider::new()));
    pipeline.build_index().await.unwrap();

    let results = pipeline.retrieve("shipping business days", 1).await.unwrap();
    assert_eq!(results[0].document, "guide.txt");
    assert_eq!(results[0].page, 3);
}

#[tokio::test]
async fn test_results_never_exceed_stored_chunks() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("one.txt"), "only one short chunk").unwrap();
    let pipeline = pipeline_with(dir.path(), Arc::new(ControlledProvider::new()));
    pipeline.build_index().await.unwrap();

    let results = pipeline.retrieve("chunk", 10).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_corrupt_document_does_not_abort_build() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.pdf"), b"%PDF-garbage").unwrap();
    std::fs::write(dir.path().join("ok.txt"), "Passwords can be reset from the login page.").unwrap();
    let config = RetrievalConfig::new(dir.path()).with_extensions(["pdf", "txt"]);
    let pipeline =
        RetrievalPipeline::with_provider(config, Arc::new(ControlledProvider::new())).unwrap();

    let report = pipeline.build_index().await.unwrap();

    assert!(report.committed);
    assert_eq!(report.documents_skipped.len(), 1);
    assert_eq!(report.documents_read, 1);
}

#[tokio::test]
async fn test_embedder_failure_during_first_build_commits_nothing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "some text").unwrap();
    let provider = Arc::new(ControlledProvider::new());
    provider.fail_batches.store(true, Ordering::SeqCst);
    let pipeline = pipeline_with(dir.path(), provider);

    let result = pipeline.build_index().await;

    assert!(matches!(result, Err(RetrievalError::Embedding(_))));
    assert!(!pipeline.is_indexed().await);
    assert!(matches!(pipeline.status(), IndexStatus::Failed { .. }));
    assert!(pipeline.retrieve("text", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_index() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("old.txt"), "legacy pricing tiers").unwrap();
    let provider = Arc::new(ControlledProvider::new());
    let pipeline = pipeline_with(dir.path(), provider.clone());
    pipeline.build_index().await.unwrap();

    std::fs::write(dir.path().join("new.txt"), "updated pricing tiers").unwrap();
    provider.fail_batches.store(true, Ordering::SeqCst);
    assert!(pipeline.build_index().await.is_err());

    let results = pipeline.retrieve("pricing", 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document, "old.txt");
}

#[tokio::test]
async fn test_empty_corpus_rebuild_keeps_previous_index() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("policy.txt"), "warranty covers two years").unwrap();
    let pipeline = pipeline_with(dir.path(), Arc::new(ControlledProvider::new()));
    pipeline.build_index().await.unwrap();
    let before = pipeline.retrieve("warranty", 3).await.unwrap();

    std::fs::remove_file(dir.path().join("policy.txt")).unwrap();
    let report = pipeline.build_index().await.unwrap();

    assert!(!report.committed);
    assert_eq!(report.pages, 0);
    assert_eq!(pipeline.status(), IndexStatus::Ready { chunks: 1 });
    let after = pipeline.retrieve("warranty", 3).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after[0].document, "policy.txt");
}

#[tokio::test]
async fn test_committed_vectors_have_unit_norm() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("manual.txt"), long_page()).unwrap();
    std::fs::write(dir.path().join("faq.txt"), "Refunds are issued within 14 days.").unwrap();
    let pipeline = pipeline_with(dir.path(), Arc::new(ControlledProvider::new()));
    pipeline.build_index().await.unwrap();

    let snapshot = pipeline.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 4);
    for position in 0..snapshot.len() {
        let vector = snapshot.vector(position).unwrap();
        assert_eq!(vector.len(), 128);
        assert!((l2_norm(vector) - 1.0).abs() < 1e-5, "position {position}");
    }
    assert!(snapshot.vector(snapshot.len()).is_none());
}

#[tokio::test]
async fn test_zero_length_embeddings_fail_the_build() {
    struct Hollow;

    #[async_trait]
    impl EmbeddingProvider for Hollow {
        fn name(&self) -> &str {
            "hollow"
        }
        fn model(&self) -> &str {
            "hollow"
        }
        fn dimension(&self) -> usize {
            0
        }
        async fn embed(&self, _text: &str) -> clearpath_embeddings::Result<Embedding> {
            Ok(Vec::new())
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "some text").unwrap();
    let pipeline = pipeline_with(dir.path(), Arc::new(Hollow));

    let result = pipeline.build_index().await;

    assert!(matches!(
        result,
        Err(RetrievalError::Embedding(EmbeddingError::EmptyEmbedding))
    ));
    assert!(!pipeline.is_indexed().await);
    assert!(pipeline.retrieve("text", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_embedder_failure_during_query_is_surfaced() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "some text").unwrap();
    let provider = Arc::new(ControlledProvider::new());
    let pipeline = pipeline_with(dir.path(), provider.clone());
    pipeline.build_index().await.unwrap();

    provider.fail_queries.store(true, Ordering::SeqCst);
    let result = pipeline.retrieve("text", 3).await;

    assert!(matches!(result, Err(RetrievalError::Embedding(_))));
}

#[tokio::test]
async fn test_rebuild_is_deterministic() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("manual.txt"), long_page()).unwrap();
    std::fs::write(dir.path().join("faq.txt"), "Refunds are issued within 14 days.").unwrap();
    let pipeline = pipeline_with(dir.path(), Arc::new(ControlledProvider::new()));

    pipeline.build_index().await.unwrap();
    let first_chunks: Vec<String> = pipeline
        .snapshot()
        .await
        .unwrap()
        .chunks()
        .iter()
        .map(|c| c.text.clone())
        .collect();
    let first = pipeline.retrieve("refund policy", 4).await.unwrap();

    pipeline.build_index().await.unwrap();
    let second_chunks: Vec<String> = pipeline
        .snapshot()
        .await
        .unwrap()
        .chunks()
        .iter()
        .map(|c| c.text.clone())
        .collect();
    let second = pipeline.retrieve("refund policy", 4).await.unwrap();

    assert_eq!(first_chunks, second_chunks);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.text, b.text);
        assert!((a.relevance_score - b.relevance_score).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_embeds_in_configured_batches() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("manual.txt"), long_page()).unwrap();
    let provider = Arc::new(ControlledProvider::new());
    let mut config = RetrievalConfig::new(dir.path()).with_extensions(["txt"]);
    config.embedding.batch_size = 2;
    let pipeline = RetrievalPipeline::with_provider(config, provider.clone()).unwrap();

    let report = pipeline.build_index().await.unwrap();

    assert_eq!(report.chunks, 3);
    assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.dimension, Some(128));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queries_during_rebuild_see_one_snapshot() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a_old.txt"), "support hours are nine to five").unwrap();
    std::fs::write(dir.path().join("b_old.txt"), "support email is monitored daily").unwrap();
    let provider = Arc::new(ControlledProvider::with_delay(Duration::from_millis(200)));
    let pipeline = Arc::new(pipeline_with(dir.path(), provider));
    pipeline.build_index().await.unwrap();

    std::fs::remove_file(dir.path().join("a_old.txt")).unwrap();
    std::fs::remove_file(dir.path().join("b_old.txt")).unwrap();
    std::fs::write(dir.path().join("c_new.txt"), "support hours are now around the clock").unwrap();
    std::fs::write(dir.path().join("d_new.txt"), "support chat replaces email").unwrap();

    let build = pipeline.spawn_build();
    let mut queries = Vec::new();
    for _ in 0..20 {
        let pipeline = Arc::clone(&pipeline);
        queries.push(tokio::spawn(async move {
            let results = pipeline.retrieve("support", 5).await.unwrap();
            tokio::time::sleep(Duration::from_millis(15)).await;
            results
        }));
    }

    for query in queries {
        let results = query.await.unwrap();
        assert_eq!(results.len(), 2);
        let old = results.iter().all(|r| r.document.contains("_old"));
        let new = results.iter().all(|r| r.document.contains("_new"));
        assert!(old || new, "mixed snapshot: {results:?}");
    }

    build.await.unwrap().unwrap();
    let results = pipeline.retrieve("support", 5).await.unwrap();
    assert!(results.iter().all(|r| r.document.contains("_new")));
}

#[tokio::test]
async fn test_spawn_build_and_wait_until_settled() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "background indexing").unwrap();
    let provider = Arc::new(ControlledProvider::with_delay(Duration::from_millis(50)));
    let pipeline = Arc::new(pipeline_with(dir.path(), provider));

    let handle = pipeline.spawn_build();
    assert_eq!(pipeline.status(), IndexStatus::Building);

    let status = pipeline.wait_until_settled().await;
    assert_eq!(status, IndexStatus::Ready { chunks: 1 });
    assert!(pipeline.is_indexed().await);
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_build_timeout_commits_nothing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "slow model").unwrap();
    let provider = Arc::new(ControlledProvider::with_delay(Duration::from_secs(5)));
    let config = RetrievalConfig::new(dir.path())
        .with_extensions(["txt"])
        .with_build_timeout(Duration::from_secs(1));
    let pipeline = RetrievalPipeline::with_provider(config, provider).unwrap();

    let result = pipeline.build_index().await;

    assert!(matches!(result, Err(RetrievalError::BuildTimedOut { secs: 1 })));
    assert!(!pipeline.is_indexed().await);
}

#[tokio::test]
async fn test_stats_reflect_active_index() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "first document").unwrap();
    std::fs::write(dir.path().join("b.txt"), "second document").unwrap();
    let pipeline = pipeline_with(dir.path(), Arc::new(ControlledProvider::new()));

    assert!(!pipeline.stats().await.indexed);
    pipeline.build_index().await.unwrap();

    let stats = pipeline.stats().await;
    assert!(stats.indexed);
    assert_eq!(stats.chunks, 2);
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.dimension, Some(128));
}
