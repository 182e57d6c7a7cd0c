//! Covariance eigendecomposition
//!
//! Wraps nalgebra's symmetric eigensolver and enforces the ordering the
//! rest of the crate relies on: eigenvalues non-increasing, eigenvectors
//! stored as the matching columns.

use crate::statistics::{region_covariance, CovarianceMatrix, ReduceParams};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array2, ArrayView1};
use nicheprep_core::{Error, Grid, Region, Result};
use serde::Serialize;
use tracing::debug;

/// Eigenvalues sorted descending, with the eigenvectors as matching columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenDecomposition {
    pub eigenvalues: Vec<f64>,
    /// `eigenvectors[(band, k)]` is the loading of `band` on component `k`
    pub eigenvectors: Array2<f64>,
}

impl EigenDecomposition {
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    /// Eigenvector of component `k`
    pub fn eigenvector(&self, k: usize) -> ArrayView1<'_, f64> {
        self.eigenvectors.column(k)
    }

    pub fn total_variance(&self) -> f64 {
        self.eigenvalues.iter().sum()
    }

    /// Share of the total variance carried by each component
    pub fn variance_explained(&self) -> Vec<f64> {
        let total = self.total_variance();
        self.eigenvalues
            .iter()
            .map(|&v| if total > 0.0 { v / total } else { 0.0 })
            .collect()
    }

    /// `VᵀV ≈ I` within `tolerance`
    pub fn is_orthonormal(&self, tolerance: f64) -> bool {
        let gram = self.eigenvectors.t().dot(&self.eigenvectors);
        gram.indexed_iter().all(|((i, j), &v)| {
            let expected = if i == j { 1.0 } else { 0.0 };
            (v - expected).abs() <= tolerance
        })
    }
}

/// Eigendecomposition of a covariance matrix.
///
/// Eigenvalues are clamped at zero (round-off can make a null direction
/// slightly negative) and sorted descending. Each eigenvector's sign is fixed
/// so its largest-magnitude loading is positive, which makes the output
/// independent of the solver's sign convention.
///
/// # Errors
/// `UndefinedStatistic` if the matrix contains non-finite values or the
/// solver does not converge.
pub fn symmetric_eigen(covariance: &CovarianceMatrix) -> Result<EigenDecomposition> {
    let n = covariance.n_bands();
    if covariance.matrix.iter().any(|v| !v.is_finite()) {
        return Err(Error::UndefinedStatistic(
            "covariance matrix contains non-finite values".into(),
        ));
    }

    let matrix = DMatrix::from_fn(n, n, |i, j| covariance.matrix[(i, j)]);
    let eigen = SymmetricEigen::try_new(matrix, f64::EPSILON, 0).ok_or_else(|| {
        Error::UndefinedStatistic("symmetric eigensolver did not converge".into())
    })?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let eigenvalues: Vec<f64> = order.iter().map(|&i| eigen.eigenvalues[i].max(0.0)).collect();
    let mut eigenvectors = Array2::from_shape_fn((n, n), |(band, k)| eigen.eigenvectors[(band, order[k])]);

    for mut column in eigenvectors.columns_mut() {
        let dominant = column
            .iter()
            .copied()
            .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
        if dominant < 0.0 {
            column.mapv_inplace(|v| -v);
        }
    }

    debug!("eigenvalues: {:?}", eigenvalues);
    Ok(EigenDecomposition {
        eigenvalues,
        eigenvectors,
    })
}

/// Covariance of a centered grid over a region, and its eigendecomposition
pub fn covariance_eigen(
    centered: &Grid,
    region: &Region,
    params: &ReduceParams,
) -> Result<(CovarianceMatrix, EigenDecomposition)> {
    let covariance = region_covariance(centered, region, params)?;
    let eigen = symmetric_eigen(&covariance)?;
    Ok((covariance, eigen))
}
