//! Criterion benchmarks for `vt-math`.
//!
//! Focus on the per-unit spectrum kernel that runs once per description.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vt_math::{compute_stats, weighted_quantile, DEFAULT_Q_HIGH, DEFAULT_Q_LOW};

fn synthetic_unit(n: usize) -> (Vec<f64>, Vec<f64>) {
    // Trait values on a 1..12 indicator scale, weights from a 1..7 abundance ladder.
    let x = (0..n).map(|i| 1.0 + ((i * 7) % 12) as f64).collect();
    let w = (0..n).map(|i| 1.0 + (i % 7) as f64).collect();
    (x, w)
}

fn bench_weighted_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("weighted");

    // Typical species counts per relevé, plus a large pooled unit.
    for n in [8usize, 30, 120, 2_000] {
        let (x, w) = synthetic_unit(n);

        group.bench_with_input(BenchmarkId::new("compute_stats", n), &(&x, &w), |b, (x, w)| {
            b.iter(|| {
                black_box(compute_stats(
                    black_box(x),
                    black_box(w),
                    DEFAULT_Q_LOW,
                    DEFAULT_Q_HIGH,
                ));
            });
        });

        group.bench_with_input(
            BenchmarkId::new("weighted_quantile", n),
            &(&x, &w),
            |b, (x, w)| {
                b.iter(|| {
                    black_box(weighted_quantile(black_box(x), black_box(w), 0.5));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_weighted_kernels);
criterion_main!(benches);
