// HTTP surface consumed by the web layer
// Thin JSON handlers over the store, cache, and orchestrator


use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::RagError;
use crate::cache::CacheLayer;
use crate::config::RetrievalConfig;
use crate::pipeline::{RetrievalOrchestrator, RetrievalOutcome};
use crate::ranker::RankedHit;
use crate::store::{EmbeddingRecord, MetadataMap, VectorStore};

const DEFAULT_LIST_LIMIT: usize = 50;
const HEALTH_PING_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<VectorStore>,
    pub cache: Arc<CacheLayer>,
    pub orchestrator: Arc<RetrievalOrchestrator>,
    pub retrieval: RetrievalConfig,
}

/// Error wrapper mapping the crate taxonomy onto status codes with JSON
/// bodies, so failures never raise past the API boundary.
pub struct ApiError(RagError);

impl From<RagError> for ApiError {
    #[inline]
    fn from(err: RagError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    #[inline]
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RagError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            RagError::NotFound(_) => StatusCode::NOT_FOUND,
            RagError::AlreadyExists(_) => StatusCode::CONFLICT,
            RagError::Dependency(_) => StatusCode::BAD_GATEWAY,
            RagError::Config(_) | RagError::Io(_) | RagError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEmbeddingRequest {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub metadata: MetadataMap,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmbeddingRequest {
    pub text: Option<String>,
    pub metadata: Option<MetadataMap>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub top_k: Option<usize>,
    pub min_similarity: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<RankedHit>,
    pub total_count: usize,
    pub search_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: &'static str,
    pub response_time_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub query: String,
}

#[inline]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/embeddings", post(create_embedding).get(list_embeddings))
        .route(
            "/embeddings/{id}",
            get(get_embedding).put(update_embedding).delete(delete_embedding),
        )
        .route("/search", post(search))
        .route("/ask", post(ask))
        .route("/health", get(health))
        .with_state(state)
}

async fn create_embedding(
    State(state): State<AppState>,
    Json(request): Json<CreateEmbeddingRequest>,
) -> Result<(StatusCode, Json<EmbeddingRecord>), ApiError> {
    let record = state
        .store
        .create(&request.document_id, &request.text, request.metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_embedding(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EmbeddingRecord>, ApiError> {
    Ok(Json(state.store.get(&id)?))
}

async fn update_embedding(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateEmbeddingRequest>,
) -> Result<Json<EmbeddingRecord>, ApiError> {
    let record = state
        .store
        .update(&id, request.text.as_deref(), request.metadata)
        .await?;
    Ok(Json(record))
}

async fn delete_embedding(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete(&id)?;
    Ok(Json(json!({ "deleted": id })))
}

async fn list_embeddings(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<EmbeddingRecord>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let offset = params.offset.unwrap_or(0);
    Json(state.store.list(limit, offset))
}

async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let top_k = request.top_k.unwrap_or(state.retrieval.top_k);
    let min_similarity = request
        .min_similarity
        .unwrap_or(state.retrieval.min_similarity);

    let started = Instant::now();
    let results = state
        .store
        .find_similar(&request.query, top_k, min_similarity)
        .await?;
    let search_time_ms = started.elapsed().as_millis() as u64;

    debug!(
        "Search returned {} results in {}ms",
        results.len(),
        search_time_ms
    );

    Ok(Json(SearchResponse {
        total_count: results.len(),
        results,
        search_time_ms,
    }))
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<RetrievalOutcome>, ApiError> {
    Ok(Json(state.orchestrator.answer(&request.query).await?))
}

/// Cheap liveness probe: a bounded cache ping and nothing else. Never scans
/// the store or touches the embedding service.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let started = Instant::now();

    let cache = match tokio::time::timeout(HEALTH_PING_TIMEOUT, state.cache.status()).await {
        Ok(status) => status,
        Err(_) => "unavailable",
    };

    Json(HealthResponse {
        status: "ok",
        cache,
        response_time_ms: started.elapsed().as_millis() as u64,
    })
}
