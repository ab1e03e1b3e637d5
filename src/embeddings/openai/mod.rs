#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::EmbeddingConfig;
use crate::embeddings::EmbeddingProvider;
use crate::{RagError, Result};

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedClient {
    base_url: Url,
    model: String,
    dimension: usize,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config
            .endpoint()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            dimension: config.dimension as usize,
            api_key: config.api_key.clone(),
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Blocking embed call. Async callers go through the `EmbeddingProvider`
    /// impl, which moves this onto a blocking worker.
    #[inline]
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let url = self
            .base_url
            .join("/v1/embeddings")
            .map_err(|e| RagError::Config(format!("Failed to build embedding URL: {}", e)))?;

        let request = EmbedRequest {
            model: &self.model,
            input: text,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Dependency(format!("Failed to serialize request: {}", e)))?;

        let mut builder = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", &format!("Bearer {}", key));
        }

        let response_text = builder
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| {
                warn!("Embedding request failed: {}", e);
                RagError::Dependency(format!("Embedding service error: {}", e))
            })?;

        let response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Dependency(format!("Invalid embedding response: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::Dependency("Embedding response contained no data".into()))?;

        if embedding.len() != self.dimension {
            return Err(RagError::Dependency(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedClient {
    #[inline]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let client = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || client.embed_sync(&text))
            .await
            .map_err(|e| RagError::Dependency(format!("Embedding task panicked: {}", e)))?
    }

    #[inline]
    fn model(&self) -> &str {
        &self.model
    }
}
