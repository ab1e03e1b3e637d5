#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end pipeline scenarios with stubbed external collaborators

use async_trait::async_trait;
use parish_rag::cache::{CacheLayer, MemoryBackend};
use parish_rag::config::{CacheSettings, RetrievalConfig};
use parish_rag::context::{self, NO_CONTEXT_MARKER};
use parish_rag::embeddings::EmbeddingProvider;
use parish_rag::generation::AnswerGenerator;
use parish_rag::pipeline::{CacheProvenance, RetrievalOrchestrator};
use parish_rag::store::{MetadataMap, VectorStore};
use parish_rag::{RagError, Result};
use std::sync::Arc;

/// Embeds text into a small deterministic vector; all components are
/// non-negative so any two texts score a non-negative similarity.
struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let sum: u32 = text.bytes().map(u32::from).sum();
        Ok(vec![text.len() as f32, (sum % 97) as f32, 1.0])
    }

    fn model(&self) -> &str {
        "hash-model-v1"
    }
}

struct CannedGenerator {
    fail: bool,
}

#[async_trait]
impl AnswerGenerator for CannedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.fail {
            return Err(RagError::Dependency("llm down".into()));
        }
        // Surface part of the prompt so tests can check what the model saw.
        Ok(format!("Answer based on {} chars of prompt", prompt.len()))
    }
}

fn retrieval_config() -> RetrievalConfig {
    RetrievalConfig {
        top_k: 1,
        min_similarity: 0.0,
        max_context_chars: 2000,
        max_results: 5,
    }
}

fn build_pipeline(
    cache_settings: CacheSettings,
    generator_fails: bool,
) -> (Arc<VectorStore>, RetrievalOrchestrator) {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder);
    let store = Arc::new(VectorStore::new(Arc::clone(&embedder)));
    let cache = Arc::new(CacheLayer::new(Arc::new(MemoryBackend::new()), cache_settings));
    let generator: Arc<dyn AnswerGenerator> = Arc::new(CannedGenerator {
        fail: generator_fails,
    });

    let orchestrator = RetrievalOrchestrator::new(
        Arc::clone(&store),
        cache,
        embedder,
        generator,
        retrieval_config(),
    );
    (store, orchestrator)
}

#[tokio::test]
async fn single_document_is_retrieved_and_cited() {
    let (store, orchestrator) = build_pipeline(CacheSettings::default(), false);
    store
        .create("doc-1", "Events are on Sundays", MetadataMap::new())
        .await
        .expect("should create document");

    let hits = store
        .find_similar("When are events?", 1, 0.0)
        .await
        .expect("search should succeed");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document_id, "doc-1");

    let assembled = context::assemble("When are events?", &hits, 2000, 5);
    assert!(assembled.prompt.contains("Events are on Sundays"));
    assert_eq!(assembled.citations.len(), 1);
    assert_eq!(assembled.citations[0].document_id, "doc-1");

    let outcome = orchestrator
        .answer("When are events?")
        .await
        .expect("pipeline should answer");
    assert_eq!(outcome.retrieved, 1);
    assert_eq!(outcome.citations[0].document_id, "doc-1");
    assert_eq!(outcome.cache, CacheProvenance::Miss);
}

#[tokio::test]
async fn empty_store_yields_no_context_outcome() {
    let (store, orchestrator) = build_pipeline(CacheSettings::default(), false);

    let hits = store
        .find_similar("When are events?", 1, 0.0)
        .await
        .expect("empty search should succeed");
    assert!(hits.is_empty());

    let assembled = context::assemble("When are events?", &hits, 2000, 5);
    assert!(assembled.prompt.contains(NO_CONTEXT_MARKER));

    let outcome = orchestrator
        .answer("When are events?")
        .await
        .expect("empty retrieval is a valid outcome");
    assert_eq!(outcome.retrieved, 0);
    assert!(outcome.citations.is_empty());
}

#[tokio::test]
async fn repeated_query_hits_answer_cache() {
    let (store, orchestrator) = build_pipeline(CacheSettings::default(), false);
    store
        .create("doc-1", "Events are on Sundays", MetadataMap::new())
        .await
        .expect("should create document");

    let first = orchestrator
        .answer("When are events?")
        .await
        .expect("first answer");
    let second = orchestrator
        .answer("when   are EVENTS?")
        .await
        .expect("second answer");

    assert_eq!(first.cache, CacheProvenance::Miss);
    assert_eq!(second.cache, CacheProvenance::Hit);
    assert_eq!(second.answer, first.answer);
}

#[tokio::test]
async fn disabled_cache_degrades_gracefully() {
    let settings = CacheSettings {
        enabled: false,
        ..CacheSettings::default()
    };
    let (store, orchestrator) = build_pipeline(settings, false);
    store
        .create("doc-1", "Events are on Sundays", MetadataMap::new())
        .await
        .expect("should create document");

    for _ in 0..2 {
        let outcome = orchestrator
            .answer("When are events?")
            .await
            .expect("should answer without cache");
        assert_eq!(outcome.cache, CacheProvenance::Disabled);
        assert_eq!(outcome.citations[0].document_id, "doc-1");
    }
}

#[tokio::test]
async fn llm_outage_surfaces_as_dependency_failure() {
    let (store, orchestrator) = build_pipeline(CacheSettings::default(), true);
    store
        .create("doc-1", "Events are on Sundays", MetadataMap::new())
        .await
        .expect("should create document");

    let result = orchestrator.answer("When are events?").await;
    assert!(matches!(result, Err(RagError::Dependency(_))));
}
