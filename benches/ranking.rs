use criterion::{Criterion, criterion_group, criterion_main};
use parish_rag::ranker::{Candidate, cosine_similarity, rank};
use parish_rag::store::MetadataMap;
use std::hint::black_box;

fn synthetic_vector(seed: usize, dimension: usize) -> Vec<f32> {
    (0..dimension)
        .map(|i| (((seed * 31 + i * 17) % 101) as f32) / 101.0)
        .collect()
}

fn synthetic_candidates(count: usize, dimension: usize) -> Vec<Candidate> {
    (0..count)
        .map(|i| Candidate {
            document_id: format!("doc-{i:05}"),
            vector: synthetic_vector(i, dimension),
            text: format!("document number {i}"),
            metadata: MetadataMap::new(),
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let dimension = 1536;
    let query = synthetic_vector(usize::MAX / 2, dimension);
    let other = synthetic_vector(7, dimension);
    let candidates = synthetic_candidates(1000, dimension);

    c.bench_function("cosine_similarity_1536d", |b| {
        b.iter(|| cosine_similarity(black_box(&query), black_box(&other)))
    });

    c.bench_function("rank_1000_candidates", |b| {
        b.iter(|| {
            rank(
                black_box(&query),
                black_box(candidates.clone()),
                black_box(5),
                black_box(0.25),
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
