// Retrieval orchestration
// Cache lookup -> embed -> search -> rank -> assemble -> generate -> cache


use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{CacheLayer, CacheLookup, Namespace};
use crate::config::RetrievalConfig;
use crate::context::{self, Citation};
use crate::embeddings::{EmbeddingProvider, embed_with_retry};
use crate::generation::AnswerGenerator;
use crate::store::VectorStore;
use crate::{RagError, Result};

/// Where the final answer came from, reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheProvenance {
    Hit,
    Miss,
    Disabled,
}

impl CacheProvenance {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            CacheProvenance::Hit => "hit",
            CacheProvenance::Miss => "miss",
            CacheProvenance::Disabled => "disabled",
        }
    }
}

/// Structured result of one query through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalOutcome {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub cache: CacheProvenance,
    pub retrieved: usize,
}

/// Payload stored in the answer cache.
#[derive(Debug, Serialize, Deserialize)]
struct CachedAnswer {
    answer: String,
    citations: Vec<Citation>,
}

pub struct RetrievalOrchestrator {
    store: Arc<VectorStore>,
    cache: Arc<CacheLayer>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
    retrieval: RetrievalConfig,
}

impl RetrievalOrchestrator {
    #[inline]
    pub fn new(
        store: Arc<VectorStore>,
        cache: Arc<CacheLayer>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            cache,
            embedder,
            generator,
            retrieval,
        }
    }

    /// Answer a query with cache-aside semantics at the answer and embedding
    /// stages. A generated answer is always returned even when caching it
    /// afterwards fails.
    #[inline]
    pub async fn answer(&self, query: &str) -> Result<RetrievalOutcome> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidArgument("query must not be empty".into()));
        }

        let normalized = normalize_query(query);
        let answer_key =
            CacheLayer::key(Namespace::Answer, &[&normalized, self.embedder.model()]);

        if let CacheLookup::Hit(payload) = self.cache.get(&answer_key).await {
            match serde_json::from_str::<CachedAnswer>(&payload) {
                Ok(cached) => {
                    info!("Answer cache hit for query (length: {})", query.len());
                    return Ok(RetrievalOutcome {
                        answer: cached.answer,
                        citations: cached.citations.clone(),
                        cache: CacheProvenance::Hit,
                        retrieved: cached.citations.len(),
                    });
                }
                Err(e) => {
                    // A malformed entry is treated as a miss and overwritten.
                    warn!("Discarding undecodable answer cache entry: {}", e);
                }
            }
        }

        let query_vector = self.query_embedding(&normalized).await?;

        let hits = self.store.find_similar_by_vector(
            &query_vector,
            self.retrieval.top_k,
            self.retrieval.min_similarity,
        );
        debug!("Retrieved {} hits for query", hits.len());

        let assembled = context::assemble(
            query,
            &hits,
            self.retrieval.max_context_chars,
            self.retrieval.max_results,
        );

        let answer = self.generator.generate(&assembled.prompt).await?;

        let cached = CachedAnswer {
            answer: answer.clone(),
            citations: assembled.citations.clone(),
        };
        match serde_json::to_string(&cached) {
            Ok(payload) => {
                // A failed cache write never fails the request.
                let stored = self
                    .cache
                    .set(Namespace::Answer, &answer_key, &payload, None)
                    .await;
                if !stored {
                    debug!("Answer was not cached");
                }
            }
            Err(e) => warn!("Failed to serialize answer for caching: {}", e),
        }

        Ok(RetrievalOutcome {
            answer,
            citations: assembled.citations,
            cache: if self.cache.enabled() {
                CacheProvenance::Miss
            } else {
                CacheProvenance::Disabled
            },
            retrieved: hits.len(),
        })
    }

    /// Cache-aside query embedding: hit the embedding cache first, recompute
    /// (with the read-path single retry) on miss or failure.
    async fn query_embedding(&self, normalized: &str) -> Result<Vec<f32>> {
        let embed_key =
            CacheLayer::key(Namespace::Embedding, &[normalized, self.embedder.model()]);

        if let CacheLookup::Hit(payload) = self.cache.get(&embed_key).await {
            match serde_json::from_str::<Vec<f32>>(&payload) {
                Ok(vector) => {
                    debug!("Embedding cache hit");
                    return Ok(vector);
                }
                Err(e) => warn!("Discarding undecodable embedding cache entry: {}", e),
            }
        }

        let vector = embed_with_retry(self.embedder.as_ref(), normalized).await?;

        match serde_json::to_string(&vector) {
            Ok(payload) => {
                self.cache
                    .set(Namespace::Embedding, &embed_key, &payload, None)
                    .await;
            }
            Err(e) => warn!("Failed to serialize embedding for caching: {}", e),
        }

        Ok(vector)
    }
}

/// Casefold and collapse whitespace so trivially different spellings of the
/// same query share one cache entry.
#[inline]
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
