use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::api::{self, AppState};
use crate::cache::{CacheLayer, MemoryBackend};
use crate::config::Config;
use crate::embeddings::{EmbeddingProvider, OpenAiEmbedClient};
use crate::generation::{AnswerGenerator, ChatCompletionClient};
use crate::pipeline::RetrievalOrchestrator;
use crate::store::VectorStore;

/// Construct the component graph once at startup. The cache client is built
/// here and injected everywhere it is needed; nothing reaches it through
/// ambient global state.
fn build_state(config: &Config) -> Result<AppState> {
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(OpenAiEmbedClient::new(&config.embedding)?);
    let generator: Arc<dyn AnswerGenerator> =
        Arc::new(ChatCompletionClient::new(&config.generation)?);

    let store = Arc::new(VectorStore::new(Arc::clone(&embedder)));
    let cache = Arc::new(CacheLayer::new(
        Arc::new(MemoryBackend::new()),
        config.cache.clone(),
    ));

    let orchestrator = Arc::new(RetrievalOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        embedder,
        generator,
        config.retrieval.clone(),
    ));

    Ok(AppState {
        store,
        cache,
        orchestrator,
        retrieval: config.retrieval.clone(),
    })
}

/// Start the HTTP API.
#[inline]
pub async fn serve(config: Config, bind: &str) -> Result<()> {
    let state = build_state(&config)?;
    let router = api::router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;

    info!("Serving retrieval API on {}", bind);
    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Run a single query through the full pipeline and print the result.
#[inline]
pub async fn ask(config: Config, query: &str) -> Result<()> {
    let state = build_state(&config)?;

    let outcome = state.orchestrator.answer(query).await?;

    println!("{}", outcome.answer);
    if !outcome.citations.is_empty() {
        println!();
        println!("Sources:");
        for citation in &outcome.citations {
            println!("  {} (score {:.3})", citation.document_id, citation.score);
        }
    }
    println!();
    println!("Cache: {}", outcome.cache.as_str());

    Ok(())
}

/// Print a component status summary.
#[inline]
pub async fn show_status(config: Config) -> Result<()> {
    let state = build_state(&config)?;

    println!("Documents stored: {}", state.store.count());
    println!("Cache: {}", state.cache.status().await);
    println!("Cache failures observed: {}", state.cache.failure_count());
    println!("Embedding model: {}", config.embedding.model);
    println!("Generation model: {}", config.generation.model);

    Ok(())
}

/// Print the effective configuration as TOML.
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    let rendered =
        toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}
