use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pairgraph_core::{DescriptorMatrix, DESCRIPTOR_WIDTH};
use pairgraph_match::{BruteForceMatcher, Matcher};

/// Deterministic pseudo-random descriptor set (xorshift, no rand dep)
fn create_benchmark_set(rows: usize, mut seed: u32) -> DescriptorMatrix {
    let mut m = DescriptorMatrix::new();
    let mut row = vec![0.0f32; DESCRIPTOR_WIDTH];
    for _ in 0..rows {
        for v in row.iter_mut() {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            *v = (seed % 256) as f32;
        }
        m.push_row(&row);
    }
    m
}

fn bench_knn_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("brute_force_knn");
    for &rows in &[64usize, 256, 512] {
        let query = create_benchmark_set(rows, 0x1234_5678);
        let train = create_benchmark_set(rows, 0x9abc_def1);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            let matcher = BruteForceMatcher::new();
            b.iter(|| matcher.knn_match(black_box(&query), black_box(&train), 2));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_knn_match);
criterion_main!(benches);
