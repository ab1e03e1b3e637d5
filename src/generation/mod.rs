// Answer generation module
// Client for the external chat-completion collaborator


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::GenerationConfig;
use crate::{RagError, Result};

/// External language-model collaborator. Failures surface as `Dependency` so
/// the calling layer can apply its own fallback message.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    base_url: Url,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl ChatCompletionClient {
    #[inline]
    pub fn new(config: &GenerationConfig) -> Result<Self> {
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
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
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

    #[inline]
    pub fn generate_sync(&self, prompt: &str) -> Result<String> {
        debug!("Generating answer for prompt (length: {})", prompt.len());

        let url = self
            .base_url
            .join("/v1/chat/completions")
            .map_err(|e| RagError::Config(format!("Failed to build completion URL: {}", e)))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
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
                warn!("Completion request failed: {}", e);
                RagError::Dependency(format!("Language model error: {}", e))
            })?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Dependency(format!("Invalid completion response: {}", e)))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RagError::Dependency("Completion response had no choices".into()))?;

        debug!("Generated answer (length: {})", answer.len());
        Ok(answer)
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionClient {
    #[inline]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let client = self.clone();
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || client.generate_sync(&prompt))
            .await
            .map_err(|e| RagError::Dependency(format!("Generation task panicked: {}", e)))?
    }
}
