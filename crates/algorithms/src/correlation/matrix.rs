//! Band × band Spearman matrix

use super::sampling::sample_at_points;
use super::spearman::{pearson, rank};
use crate::maybe_rayon::*;
use ndarray::Array2;
use nicheprep_core::{Algorithm, Error, Grid, PointSet, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Symmetric Spearman matrix. Undefined coefficients (a constant band) are
/// stored as NaN and reported as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
    /// Rows that survived sampling
    pub sample_count: usize,
}

impl CorrelationMatrix {
    pub fn n_bands(&self) -> usize {
        self.names.len()
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get((i, j)).copied().filter(|v| v.is_finite())
    }

    /// Coefficient between two named bands.
    ///
    /// # Errors
    /// - `BandNotFound` for an unknown name
    /// - `UndefinedStatistic` when either band was constant over the samples
    pub fn coefficient(&self, a: &str, b: &str) -> Result<f64> {
        let index = |name: &str| {
            self.names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| Error::BandNotFound(name.to_string()))
        };
        let (i, j) = (index(a)?, index(b)?);
        self.get(i, j).ok_or_else(|| {
            Error::UndefinedStatistic(format!("correlation of '{}' and '{}' (constant band)", a, b))
        })
    }

    pub fn is_symmetric(&self) -> bool {
        let n = self.n_bands();
        (0..n).all(|i| (0..n).all(|j| self.get(i, j) == self.get(j, i)))
    }

    /// `band → band → coefficient`, `None` where undefined
    pub fn to_nested(&self) -> BTreeMap<String, BTreeMap<String, Option<f64>>> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let row = self
                    .names
                    .iter()
                    .enumerate()
                    .map(|(j, b)| (b.clone(), self.get(i, j)))
                    .collect();
                (a.clone(), row)
            })
            .collect()
    }
}

impl Serialize for CorrelationMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_nested().serialize(serializer)
    }
}

/// Parameters for the correlation matrix
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CorrelationParams {
    /// Sampling cell size; `None` samples the grid at its own resolution
    pub scale: Option<f64>,
}

/// Spearman correlation between every pair of bands of `grid`, sampled at
/// `points`.
///
/// Rows with no-data in any band are dropped before ranking. The diagonal is
/// exactly 1.0 for every non-constant band; a constant band is undefined
/// against every band, itself included.
///
/// # Errors
/// `InsufficientData` when fewer than two points survive sampling.
pub fn correlation_matrix(grid: &Grid, points: &PointSet, scale: Option<f64>) -> Result<CorrelationMatrix> {
    let table = sample_at_points(grid, points, scale)?;
    if table.n_rows() < 2 {
        return Err(Error::InsufficientData {
            needed: 2,
            found: table.n_rows(),
            context: "complete sample rows for correlation".into(),
        });
    }
    if table.dropped > 0 {
        warn!("{} of {} points dropped before correlation", table.dropped, points.len());
    }

    let n = table.names.len();
    let ranks: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|b| rank(&table.column(b)))
        .collect();

    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect();
    let coefficients: Vec<f64> = pairs
        .clone()
        .into_par_iter()
        .map(|(i, j)| match pearson(&ranks[i], &ranks[j]) {
            Some(_) if i == j => 1.0,
            Some(r) => r,
            None => f64::NAN,
        })
        .collect();

    let mut values = Array2::from_elem((n, n), f64::NAN);
    for (&(i, j), &r) in pairs.iter().zip(&coefficients) {
        values[(i, j)] = r;
        values[(j, i)] = r;
    }

    let undefined = (0..n).filter(|&i| values[(i, i)].is_nan()).count();
    if undefined > 0 {
        debug!("{} constant bands have undefined correlations", undefined);
    }
    info!("Spearman matrix of {} bands over {} points", n, table.n_rows());

    Ok(CorrelationMatrix {
        names: table.names,
        values,
        sample_count: table.rows.len(),
    })
}

/// Correlation algorithm: input is the predictor grid and the sample points
#[derive(Debug, Clone, Default)]
pub struct Correlation;

impl Algorithm for Correlation {
    type Input = (Grid, PointSet);
    type Output = CorrelationMatrix;
    type Params = CorrelationParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Correlation"
    }

    fn description(&self) -> &'static str {
        "Spearman rank correlation matrix of bands sampled at points"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (grid, points) = input;
        correlation_matrix(&grid, &points, params.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nicheprep_core::GeoTransform;

    fn grid() -> Grid {
        let a = Array2::from_shape_fn((5, 5), |(r, c)| (r * 5 + c) as f64);
        let b = a.mapv(|v| v * v);
        let c = a.mapv(|v| -v);
        let k = Array2::from_elem((5, 5), 3.0);
        Grid::from_bands(
            GeoTransform::north_up(0.0, 5.0, 1.0),
            vec![("a".into(), a), ("b".into(), b), ("c".into(), c), ("k".into(), k)],
        )
        .unwrap()
    }

    fn points() -> PointSet {
        PointSet::from_coords((0..5).map(|i| (i as f64 + 0.5, 4.5 - i as f64 * 0.9)))
    }

    #[test]
    fn test_matrix() {
        let m = correlation_matrix(&grid(), &points(), None).unwrap();
        assert_eq!(m.n_bands(), 4);
        assert_eq!(m.sample_count, 5);
        assert!(m.is_symmetric());
        assert_eq!(m.get(0, 0), Some(1.0));
        assert_relative_eq!(m.coefficient("a", "b").unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.coefficient("a", "c").unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_band_is_undefined() {
        let m = correlation_matrix(&grid(), &points(), None).unwrap();
        assert_eq!(m.get(3, 3), None);
        assert_eq!(m.get(0, 3), None);
        assert!(matches!(m.coefficient("k", "a"), Err(Error::UndefinedStatistic(_))));
        assert!(matches!(m.coefficient("zz", "a"), Err(Error::BandNotFound(_))));
    }

    #[test]
    fn test_nested_json() {
        let m = correlation_matrix(&grid(), &points(), None).unwrap();
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["a"]["a"], serde_json::json!(1.0));
        assert!(json["k"]["a"].is_null());
        assert_eq!(json.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_too_few_points() {
        let points = PointSet::from_coords([(0.5, 0.5), (50.0, 50.0)]);
        let result = Correlation.execute((grid(), points), CorrelationParams::default());
        assert!(matches!(result, Err(Error::InsufficientData { needed: 2, found: 1, .. })));
    }
}
