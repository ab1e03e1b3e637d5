// Similarity ranking module
// Pure scoring over stored vectors; no I/O, no shared state

#[cfg(test)]
mod tests;

use serde::Serialize;

use crate::store::MetadataMap;

/// A stored vector plus the fields carried through to ranked hits.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub document_id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: MetadataMap,
}

/// Scored search hit, sorted descending by score.
#[derive(Debug, Clone, Serialize)]
pub struct RankedHit {
    pub document_id: String,
    pub score: f32,
    pub text: String,
    pub metadata: MetadataMap,
}

/// Cosine similarity of two vectors. A zero-norm operand yields 0.0 rather
/// than dividing by zero.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot = x.mul_add(*y, dot);
        norm_a = x.mul_add(*x, norm_a);
        norm_b = y.mul_add(*y, norm_b);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Score every candidate against the query vector, drop those below
/// `min_similarity`, and return the `top_k` best. Runs in O(n·d); ties break
/// by `document_id` ascending for determinism.
#[inline]
pub fn rank(
    query_vector: &[f32],
    candidates: Vec<Candidate>,
    top_k: usize,
    min_similarity: f32,
) -> Vec<RankedHit> {
    let mut hits: Vec<RankedHit> = candidates
        .into_iter()
        .map(|candidate| {
            let score = cosine_similarity(query_vector, &candidate.vector);
            RankedHit {
                document_id: candidate.document_id,
                score,
                text: candidate.text,
                metadata: candidate.metadata,
            }
        })
        .filter(|hit| hit.score >= min_similarity)
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
    hits.truncate(top_k);
    hits
}
