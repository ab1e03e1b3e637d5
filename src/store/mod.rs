// Semantic document store
// Owns embedding records; CRUD plus brute-force similarity search


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::embeddings::{EmbeddingProvider, embed_with_retry};
use crate::ranker::{self, Candidate, RankedHit};
use crate::{RagError, Result};

pub type MetadataMap = BTreeMap<String, MetadataValue>;

/// Free-form metadata attached to a record. Tagged union rather than a raw
/// JSON value so writers and readers agree on the shapes that are allowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<MetadataValue>),
    Map(BTreeMap<String, MetadataValue>),
}

/// A stored document with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub document_id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: MetadataMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory vector store. Reads take a shared lock and never block each
/// other; writes to the map are serialized, and embedding computation always
/// completes before a record becomes visible.
pub struct VectorStore {
    embedder: Arc<dyn EmbeddingProvider>,
    records: RwLock<HashMap<String, EmbeddingRecord>>,
}

impl VectorStore {
    #[inline]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new record. The embedding is computed before anything is
    /// inserted, so a collaborator failure leaves no partial write.
    #[inline]
    pub async fn create(
        &self,
        document_id: &str,
        text: &str,
        metadata: MetadataMap,
    ) -> Result<EmbeddingRecord> {
        validate_document_id(document_id)?;
        validate_text(text)?;

        if self.contains(document_id) {
            return Err(RagError::AlreadyExists(format!(
                "document '{}' already exists",
                document_id
            )));
        }

        // Mutation path: no retry, callers retry explicitly.
        let vector = self.embedder.embed(text).await?;

        let now = Utc::now();
        let record = EmbeddingRecord {
            document_id: document_id.to_string(),
            text: text.to_string(),
            vector,
            metadata,
            created_at: now,
            updated_at: now,
        };

        let mut records = self.write_lock();
        if records.contains_key(document_id) {
            // Raced with a concurrent create; the original stays untouched.
            return Err(RagError::AlreadyExists(format!(
                "document '{}' already exists",
                document_id
            )));
        }
        records.insert(document_id.to_string(), record.clone());
        drop(records);

        info!("Created embedding record '{}'", document_id);
        Ok(record)
    }

    #[inline]
    pub fn get(&self, document_id: &str) -> Result<EmbeddingRecord> {
        validate_document_id(document_id)?;

        self.read_lock()
            .get(document_id)
            .cloned()
            .ok_or_else(|| RagError::NotFound(format!("document '{}' not found", document_id)))
    }

    /// Update text and/or metadata. A text change re-embeds before the new
    /// record is swapped in, so readers never observe a half-updated pair.
    #[inline]
    pub async fn update(
        &self,
        document_id: &str,
        text: Option<&str>,
        metadata: Option<MetadataMap>,
    ) -> Result<EmbeddingRecord> {
        validate_document_id(document_id)?;
        if text.is_none() && metadata.is_none() {
            return Err(RagError::InvalidArgument(
                "update requires at least one of text or metadata".into(),
            ));
        }
        if let Some(text) = text {
            validate_text(text)?;
        }

        let current = self.get(document_id)?;

        let new_vector = match text {
            Some(new_text) if new_text != current.text => {
                Some(self.embedder.embed(new_text).await?)
            }
            _ => None,
        };

        let mut records = self.write_lock();
        let record = records
            .get_mut(document_id)
            .ok_or_else(|| RagError::NotFound(format!("document '{}' not found", document_id)))?;

        if let Some(new_text) = text {
            record.text = new_text.to_string();
        }
        if let Some(vector) = new_vector {
            record.vector = vector;
        }
        if let Some(metadata) = metadata {
            record.metadata = metadata;
        }
        record.updated_at = Utc::now();

        let updated = record.clone();
        drop(records);

        info!("Updated embedding record '{}'", document_id);
        Ok(updated)
    }

    /// Delete is deliberately not idempotent: deleting an absent id is
    /// `NotFound`, mirroring the create/update validation ordering.
    #[inline]
    pub fn delete(&self, document_id: &str) -> Result<()> {
        validate_document_id(document_id)?;

        let removed = self.write_lock().remove(document_id);
        match removed {
            Some(_) => {
                info!("Deleted embedding record '{}'", document_id);
                Ok(())
            }
            None => Err(RagError::NotFound(format!(
                "document '{}' not found",
                document_id
            ))),
        }
    }

    /// Stable listing: `created_at` ascending, ties by `document_id`.
    #[inline]
    pub fn list(&self, limit: usize, offset: usize) -> Vec<EmbeddingRecord> {
        let mut records: Vec<EmbeddingRecord> = self.read_lock().values().cloned().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        records.into_iter().skip(offset).take(limit).collect()
    }

    /// Embed the query and rank every stored vector against it. An empty
    /// store yields an empty result without touching the embedding service.
    #[inline]
    pub async fn find_similar(
        &self,
        query_text: &str,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<RankedHit>> {
        validate_text(query_text)?;

        if self.count() == 0 {
            debug!("Similarity search against empty store");
            return Ok(Vec::new());
        }

        let query_vector = embed_with_retry(self.embedder.as_ref(), query_text).await?;
        Ok(self.find_similar_by_vector(&query_vector, top_k, min_similarity))
    }

    /// Rank stored vectors against an already-computed query vector.
    #[inline]
    pub fn find_similar_by_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Vec<RankedHit> {
        let candidates: Vec<Candidate> = self
            .read_lock()
            .values()
            .map(|record| Candidate {
                document_id: record.document_id.clone(),
                vector: record.vector.clone(),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
            })
            .collect();

        debug!(
            "Ranking {} candidates (top_k={}, min_similarity={})",
            candidates.len(),
            top_k,
            min_similarity
        );
        ranker::rank(query_vector, candidates, top_k, min_similarity)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.read_lock().len()
    }

    /// Bulk clear; returns the number of records removed.
    #[inline]
    pub fn clear(&self) -> usize {
        let mut records = self.write_lock();
        let removed = records.len();
        records.clear();
        removed
    }

    fn contains(&self, document_id: &str) -> bool {
        self.read_lock().contains_key(document_id)
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, EmbeddingRecord>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, EmbeddingRecord>> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_document_id(document_id: &str) -> Result<()> {
    if document_id.trim().is_empty() {
        return Err(RagError::InvalidArgument(
            "document_id must not be empty".into(),
        ));
    }
    Ok(())
}

fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(RagError::InvalidArgument("text must not be empty".into()));
    }
    Ok(())
}
