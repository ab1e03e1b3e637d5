use super::*;
use crate::store::MetadataMap;

fn candidate(id: &str, vector: Vec<f32>) -> Candidate {
    Candidate {
        document_id: id.to_string(),
        vector,
        text: format!("text for {}", id),
        metadata: MetadataMap::new(),
    }
}

#[test]
fn self_similarity_is_one() {
    let v = vec![0.3, -0.7, 0.2, 0.9];
    let sim = cosine_similarity(&v, &v);

    assert!((sim - 1.0).abs() < 1e-6, "expected ~1.0, got {}", sim);
}

#[test]
fn similarity_is_symmetric() {
    let a = vec![0.1, 0.5, -0.3];
    let b = vec![0.9, -0.2, 0.4];

    assert!((cosine_similarity(&a, &b) - cosine_similarity(&b, &a)).abs() < 1e-6);
}

#[test]
fn zero_norm_vector_scores_zero() {
    let zero = vec![0.0, 0.0, 0.0];
    let other = vec![1.0, 2.0, 3.0];

    assert!(cosine_similarity(&zero, &other).abs() < f32::EPSILON);
    assert!(cosine_similarity(&zero, &zero).abs() < f32::EPSILON);
}

#[test]
fn orthogonal_vectors_score_zero() {
    let a = vec![1.0, 0.0];
    let b = vec![0.0, 1.0];

    assert!(cosine_similarity(&a, &b).abs() < 1e-6);
}

#[test]
fn opposite_vectors_score_negative_one() {
    let a = vec![1.0, 2.0];
    let b = vec![-1.0, -2.0];

    assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
}

#[test]
fn rank_sorts_descending_and_truncates() {
    let query = vec![1.0, 0.0];
    let candidates = vec![
        candidate("far", vec![0.0, 1.0]),
        candidate("near", vec![1.0, 0.1]),
        candidate("mid", vec![1.0, 1.0]),
    ];

    let hits = rank(&query, candidates, 2, -1.0);

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document_id, "near");
    assert_eq!(hits[1].document_id, "mid");
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn rank_filters_below_threshold() {
    let query = vec![1.0, 0.0];
    let candidates = vec![
        candidate("aligned", vec![1.0, 0.0]),
        candidate("orthogonal", vec![0.0, 1.0]),
    ];

    let hits = rank(&query, candidates, 10, 0.5);

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document_id, "aligned");
    assert!(hits.iter().all(|h| h.score >= 0.5));
}

#[test]
fn rank_breaks_ties_by_document_id() {
    let query = vec![1.0, 0.0];
    // Identical vectors, identical scores.
    let candidates = vec![
        candidate("doc-b", vec![2.0, 0.0]),
        candidate("doc-a", vec![2.0, 0.0]),
        candidate("doc-c", vec![2.0, 0.0]),
    ];

    let hits = rank(&query, candidates, 3, 0.0);

    let ids: Vec<&str> = hits.iter().map(|h| h.document_id.as_str()).collect();
    assert_eq!(ids, vec!["doc-a", "doc-b", "doc-c"]);
}

#[test]
fn rank_empty_candidates_yields_empty() {
    let hits = rank(&[1.0, 0.0], Vec::new(), 5, 0.0);
    assert!(hits.is_empty());
}
