//! Benchmarks for centering and PCA

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use nicheprep_algorithms::pca::{center, compute_pca, PcaParams};
use nicheprep_algorithms::statistics::ReduceParams;
use nicheprep_core::{GeoTransform, Grid, Region};

fn create_stack(size: usize, n_bands: usize) -> Grid {
    let bands = (0..n_bands)
        .map(|b| {
            let band = Array2::from_shape_fn((size, size), |(row, col)| {
                let base = (row * (b + 1) + col) as f64;
                let variation = ((row * 7 + col * 13 + b * 31) % 100) as f64 / 10.0;
                base + variation
            });
            (format!("bio{:02}", b + 1), band)
        })
        .collect();
    Grid::from_bands(GeoTransform::north_up(0.0, size as f64, 1.0), bands).unwrap()
}

fn bench_pca(c: &mut Criterion) {
    let mut group = c.benchmark_group("pca");
    group.sample_size(10);

    for size in [128, 256, 512].iter() {
        let grid = create_stack(*size, 19);
        let region = Region::bbox(0.0, 0.0, *size as f64, *size as f64).unwrap();
        let (centered, _) = center(&grid, &region, &ReduceParams::default()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| compute_pca(black_box(&centered), &region, &PcaParams::default()).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pca);
criterion_main!(benches);
