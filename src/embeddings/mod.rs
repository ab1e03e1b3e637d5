// Embedding generation module
// Turns text into fixed-length vectors via an external collaborator

pub mod openai;

use crate::{RagError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

pub use openai::OpenAiEmbedClient;

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// External embedding collaborator. The production implementation talks to an
/// OpenAI-compatible endpoint; tests substitute deterministic stubs.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. Performs no internal retry: the read-like query
    /// path retries once at the call site, the create/update mutation path
    /// never does.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier (with revision), used in cache key derivation.
    fn model(&self) -> &str;
}

/// Retry-once wrapper for read-like embedding calls (embedding a query).
/// A transient collaborator failure gets one more attempt after a short
/// backoff; everything else propagates unchanged.
#[inline]
pub async fn embed_with_retry(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    match provider.embed(text).await {
        Ok(vector) => Ok(vector),
        Err(RagError::Dependency(reason)) => {
            warn!("Embedding failed ({}), retrying once", reason);
            tokio::time::sleep(RETRY_BACKOFF).await;
            provider.embed(text).await
        }
        Err(e) => Err(e),
    }
}
