//! Benchmarks for vector search

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flatvec::{HnswIndex, HnswParams, Metric, StoreConfig, VectorStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DIM: usize = 128;

fn create_random_vectors(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen::<f32>()).collect())
        .collect()
}

fn benchmark_flat_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_search");
    let mut rng = StdRng::seed_from_u64(1);

    for metric in [Metric::L2Squared, Metric::Cosine] {
        for size in [1_000usize, 10_000, 100_000] {
            let mut store: VectorStore<usize> = VectorStore::new(DIM, metric, size).unwrap();
            store
                .insert_batch(create_random_vectors(&mut rng, size, DIM).into_iter().enumerate())
                .unwrap();
            let query = vec![0.5f32; DIM];

            group.bench_with_input(
                BenchmarkId::new(metric.name(), size),
                &size,
                |b, _| b.iter(|| store.query(black_box(&query), black_box(10)).unwrap()),
            );
        }
    }

    group.finish();
}

fn benchmark_flat_vs_hnsw(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_vs_hnsw");
    group.sample_size(20);
    let mut rng = StdRng::seed_from_u64(2);

    for size in [1_000usize, 10_000] {
        let vectors = create_random_vectors(&mut rng, size, DIM);
        let config = StoreConfig::new(DIM, Metric::L2Squared).with_capacity(size);

        let mut flat: VectorStore<usize> = VectorStore::from_config(config.clone()).unwrap();
        flat.insert_batch(vectors.iter().cloned().enumerate()).unwrap();

        let index = HnswIndex::with_params(HnswParams::new(16, 200, 50)).unwrap();
        let mut hnsw: VectorStore<usize, HnswIndex> =
            VectorStore::with_index(config, index).unwrap();
        hnsw.insert_batch(vectors.into_iter().enumerate()).unwrap();

        let query = vec![0.5f32; DIM];
        group.bench_with_input(BenchmarkId::new("flat", size), &size, |b, _| {
            b.iter(|| flat.query(black_box(&query), black_box(10)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("hnsw", size), &size, |b, _| {
            b.iter(|| hnsw.query(black_box(&query), black_box(10)).unwrap())
        });
    }

    group.finish();
}

fn benchmark_insert(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let vectors = create_random_vectors(&mut rng, 10_000, DIM);

    c.bench_function("insert_10k_flat", |b| {
        b.iter(|| {
            let mut store: VectorStore<usize> = VectorStore::new(DIM, Metric::L2Squared, 0).unwrap();
            for (i, v) in vectors.iter().enumerate() {
                store.insert(i, v).unwrap();
            }
            store
        })
    });
}

criterion_group!(benches, benchmark_flat_search, benchmark_flat_vs_hnsw, benchmark_insert);
criterion_main!(benches);
