//! End-to-end scenarios on small synthetic inputs.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::Array2;
use nicheprep_algorithms::prelude::*;
use nicheprep_core::config::Units;

fn grid(bands: Vec<(&str, Array2<f64>)>) -> Grid {
    let bands = bands.into_iter().map(|(n, a)| (n.to_string(), a)).collect();
    Grid::from_bands(GeoTransform::north_up(0.0, 10.0, 1.0), bands).unwrap()
}

#[test]
fn two_clusters_become_two_points() {
    let points = PointSet::from_coords([(1.1, 1.2), (1.4, 1.9), (7.3, 8.6), (7.8, 8.1)]);
    let result = Deduplicate.execute(points, DedupParams::new(1.0)).unwrap();
    assert_eq!(result.len(), 2);

    // Samples of three bands at the survivors stay complete
    let env = grid(vec![
        ("a", Array2::from_shape_fn((10, 10), |(r, c)| (r + c) as f64)),
        ("b", Array2::from_shape_fn((10, 10), |(r, _)| r as f64)),
        ("c", Array2::from_shape_fn((10, 10), |(_, c)| c as f64)),
    ]);
    let table = nicheprep_algorithms::correlation::sample_at_points(&env, &result, None).unwrap();
    assert_eq!(table.n_rows(), 2);
}

#[test]
fn perfectly_correlated_bands() {
    let band1 = Array2::from_shape_fn((10, 10), |(r, c)| (r * 10 + c) as f64 * 0.37 + 2.0);
    let band2 = band1.mapv(|v| 2.0 * v);
    let env = grid(vec![("band1", band1), ("band2", band2)]);
    let points = PointSet::from_coords((0..10).map(|i| (i as f64 + 0.5, (9 - i) as f64 + 0.5 - 0.1 * i as f64)));

    let m = Correlation.execute((env, points), CorrelationParams::default()).unwrap();
    assert_relative_eq!(m.coefficient("band1", "band2").unwrap(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(m.coefficient("band2", "band1").unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn rank_one_covariance_gives_zero_second_component() {
    let band1 = Array2::from_shape_fn((10, 10), |(r, c)| r as f64 * 1.5 + c as f64 * 0.25);
    let band2 = band1.mapv(|v| 3.0 * v - 7.0);
    let env = grid(vec![("band1", band1), ("band2", band2)]);
    let region = Region::bbox(0.0, 0.0, 10.0, 10.0).unwrap();

    let (centered, _) = center(&env, &region, &ReduceParams::default()).unwrap();
    let result = Pca.execute((centered, region), PcaParams::default()).unwrap();

    assert_abs_diff_eq!(result.eigen.eigenvalues[1], 0.0, epsilon = 1e-9);
    assert_eq!(result.std_devs[1], 0.0);
    let pc2 = result.components.band("pc2").unwrap();
    assert!(pc2.iter().all(|&v| v == 0.0));
    let pc1 = result.components.band("pc1").unwrap();
    assert!(pc1.iter().all(|v| v.is_finite()));
}

#[test]
fn full_pipeline_on_synthetic_environment() {
    let shape = (30, 40);
    let env = Grid::from_bands(
        GeoTransform::north_up(-20.0, 15.0, 0.5),
        vec![
            ("bio01".into(), Array2::from_shape_fn(shape, |(r, c)| 25.0 - r as f64 * 0.4 + (c % 7) as f64)),
            ("bio04".into(), Array2::from_shape_fn(shape, |(r, c)| (r * c % 13) as f64 + c as f64 * 0.2)),
            ("bio12".into(), Array2::from_shape_fn(shape, |(r, c)| 1500.0 - r as f64 * 20.0 - c as f64 * 5.0)),
            ("elevation".into(), Array2::from_shape_fn(shape, |(r, c)| if r + c < 5 { -1.0 } else { (r * 3 + c) as f64 })),
            ("Percent_Tree_Cover".into(), Array2::from_shape_fn(shape, |(r, c)| ((r + c) % 10) as f64 * 10.0)),
        ],
    )
    .unwrap();

    let points = PointSet::from_coords((0..200).map(|i| {
        let x = -19.8 + (i * 37 % 400) as f64 * 0.049;
        let y = 14.8 - (i * 53 % 300) as f64 * 0.049;
        (x, y)
    }));

    let config = PipelineConfig {
        grain_size: 0.5,
        mean_scale: 0.5,
        units: Units::Metres,
        region: [-20.0, 0.0, 0.0, 15.0],
        pca_bands: vec!["bio01".into(), "bio04".into(), "bio12".into()],
        ..PipelineConfig::default()
    };
    let output = PredictorPipeline::new(config).unwrap().run(&points, &env).unwrap();

    assert_eq!(output.predictors.band_names(), ["pc1", "pc2", "elevation", "Percent_Tree_Cover"]);
    assert!(output.occurrences.len() <= points.len());
    assert!(output.correlation.is_symmetric());
    let nested = output.correlation.to_nested();
    assert_eq!(nested["pc1"]["pc1"], Some(1.0));
    assert_eq!(nested.len(), 4);
}
