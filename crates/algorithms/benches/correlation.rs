//! Benchmarks for the Spearman matrix

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use nicheprep_algorithms::correlation::correlation_matrix;
use nicheprep_core::{GeoTransform, Grid, PointSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn create_stack(size: usize, n_bands: usize) -> Grid {
    let bands = (0..n_bands)
        .map(|b| {
            let band = Array2::from_shape_fn((size, size), |(row, col)| {
                ((row * 7 + col * 13 + b * 31) % 101) as f64 + row as f64 * 0.1
            });
            (format!("band{}", b + 1), band)
        })
        .collect();
    Grid::from_bands(GeoTransform::north_up(0.0, size as f64, 1.0), bands).unwrap()
}

fn bench_correlation(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation");
    let grid = create_stack(512, 6);
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for n_points in [100, 1_000, 10_000].iter() {
        let points = PointSet::from_coords((0..*n_points).map(|_| (rng.gen_range(0.0..512.0), rng.gen_range(0.0..512.0))));

        group.bench_with_input(BenchmarkId::from_parameter(n_points), n_points, |b, _| {
            b.iter(|| correlation_matrix(black_box(&grid), &points, None).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_correlation);
criterion_main!(benches);
