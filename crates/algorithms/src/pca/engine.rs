//! PCA over a multi-band grid
//!
//! Steps: center the bands on their region mean, compute the covariance and
//! its eigendecomposition over the region, project every valid pixel onto
//! the eigenvectors, then divide each component by its standard deviation.

use super::eigen::{covariance_eigen, EigenDecomposition};
use crate::algebra::{subtract, Operand};
use crate::maybe_rayon::*;
use crate::statistics::{region_mean, CovarianceMatrix, ReduceParams};
use ndarray::{s, Array3};
use nicheprep_core::{Algorithm, Error, Grid, Region, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Parameters for PCA
#[derive(Debug, Clone, PartialEq)]
pub struct PcaParams {
    /// Resolution and pixel budget of the covariance reduction
    pub reduce: ReduceParams,
    /// Eigenvalues at or below this fraction of the largest one are treated
    /// as zero variance
    pub zero_variance_tolerance: f64,
}

impl Default for PcaParams {
    fn default() -> Self {
        Self {
            reduce: ReduceParams::default(),
            zero_variance_tolerance: 1e-10,
        }
    }
}

/// Result of PCA
#[derive(Debug, Clone)]
pub struct PcaResult {
    /// Standardized components `pc1..pcb`
    pub components: Grid,
    /// Raw projections, same names and geometry as `components`
    pub scores: Grid,
    pub covariance: CovarianceMatrix,
    pub eigen: EigenDecomposition,
    /// `sqrt(eigenvalue)` per component; zero for zero-variance components
    pub std_devs: Vec<f64>,
}

impl PcaResult {
    pub fn n_components(&self) -> usize {
        self.std_devs.len()
    }

    pub fn component_names(&self) -> &[String] {
        self.components.band_names()
    }

    /// `sd1..sdb`
    pub fn sd_names(&self) -> Vec<String> {
        component_names("sd", self.n_components())
    }

    pub fn variance_explained(&self) -> Vec<f64> {
        self.eigen.variance_explained()
    }

    /// The first `k` standardized components
    pub fn select_leading(&self, k: usize) -> Result<Grid> {
        if k == 0 || k > self.n_components() {
            return Err(Error::InsufficientData {
                needed: k,
                found: self.n_components(),
                context: "leading principal components".into(),
            });
        }
        self.components.select(&self.component_names()[..k])
    }

    /// Rotate the raw scores back into band space with the transposed
    /// eigenvectors. Gives the centered input back on valid pixels.
    pub fn reconstruct(&self) -> Result<Grid> {
        let v = &self.eigen.eigenvectors;
        let (rows, cols) = self.scores.shape();
        let scores = self.scores.data();
        let n = self.n_components();

        let data = Array3::from_shape_fn((n, rows, cols), |(band, r, c)| {
            let pixel = scores.slice(s![.., r, c]);
            pixel.iter().zip(v.row(band).iter()).map(|(s, l)| s * l).sum::<f64>()
        });
        self.scores.with_data(self.covariance.names.clone(), data)
    }

    pub fn summary(&self) -> PcaSummary {
        let explained = self.variance_explained();
        let components = self
            .component_names()
            .iter()
            .zip(self.sd_names())
            .enumerate()
            .map(|(k, (name, sd_name))| ComponentSummary {
                name: name.clone(),
                sd_name,
                eigenvalue: self.eigen.eigenvalues[k],
                std_dev: self.std_devs[k],
                variance_explained: explained[k],
                loadings: self
                    .covariance
                    .names
                    .iter()
                    .zip(self.eigen.eigenvector(k).iter())
                    .map(|(band, &l)| (band.clone(), l))
                    .collect(),
            })
            .collect();
        PcaSummary {
            bands: self.covariance.names.clone(),
            sample_count: self.covariance.sample_count,
            components,
        }
    }
}

/// Serializable digest of a PCA run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcaSummary {
    pub bands: Vec<String>,
    pub sample_count: usize,
    pub components: Vec<ComponentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub name: String,
    pub sd_name: String,
    pub eigenvalue: f64,
    pub std_dev: f64,
    pub variance_explained: f64,
    pub loadings: BTreeMap<String, f64>,
}

/// `prefix1..prefix<count>`
pub fn component_names(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{}{}", prefix, i)).collect()
}

/// Subtract from each band its mean over `region`.
///
/// Returns the centered grid and the means that were removed.
pub fn center(grid: &Grid, region: &Region, params: &ReduceParams) -> Result<(Grid, Vec<f64>)> {
    let means = region_mean(grid, region, params)?;
    debug!("band means: {:?}", means);
    let centered = subtract(grid, Operand::PerBand(&means))?;
    Ok((centered, means))
}

/// Principal components of a centered grid.
///
/// The covariance is reduced over `region` at `params.reduce`; the projection
/// covers every pixel of `centered`. A pixel with no-data in any band is
/// no-data in every component.
///
/// # Errors
/// - `InsufficientData` when the region holds fewer valid pixels than bands
/// - `ResourceExceeded` when the covariance reduction exceeds the budget
pub fn compute_pca(centered: &Grid, region: &Region, params: &PcaParams) -> Result<PcaResult> {
    let n_bands = centered.n_bands();
    let (covariance, eigen) = covariance_eigen(centered, region, &params.reduce)?;

    let max_eigenvalue = eigen.eigenvalues.first().copied().unwrap_or(0.0);
    let threshold = max_eigenvalue * params.zero_variance_tolerance;
    let std_devs: Vec<f64> = eigen
        .eigenvalues
        .iter()
        .map(|&v| if v > threshold { v.sqrt() } else { 0.0 })
        .collect();

    let zero_variance = std_devs.iter().filter(|&&sd| sd == 0.0).count();
    if zero_variance > 0 {
        debug!("{} zero-variance components standardized to 0", zero_variance);
    }

    let (rows, cols) = centered.shape();
    let data = centered.data();
    let v = &eigen.eigenvectors;

    // Per row: scores then standardized values, each laid out [component][col]
    let row_results: Vec<(Vec<f64>, Vec<f64>)> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut scores = vec![f64::NAN; n_bands * cols];
            let mut standardized = vec![f64::NAN; n_bands * cols];
            let mut pixel = vec![0.0; n_bands];

            for col in 0..cols {
                for (b, p) in pixel.iter_mut().enumerate() {
                    *p = data[[b, row, col]];
                }
                if pixel.iter().any(|p| !p.is_finite()) {
                    continue;
                }
                for k in 0..n_bands {
                    let score: f64 = pixel.iter().enumerate().map(|(b, p)| p * v[(b, k)]).sum();
                    scores[k * cols + col] = score;
                    standardized[k * cols + col] = if std_devs[k] > 0.0 { score / std_devs[k] } else { 0.0 };
                }
            }
            (scores, standardized)
        })
        .collect();

    let shape = (n_bands, rows, cols);
    let names = component_names("pc", n_bands);
    let scores = centered.with_data(
        names.clone(),
        Array3::from_shape_fn(shape, |(k, r, c)| row_results[r].0[k * cols + c]),
    )?;
    let components = centered.with_data(
        names,
        Array3::from_shape_fn(shape, |(k, r, c)| row_results[r].1[k * cols + c]),
    )?;

    info!(
        "PCA of {} bands over {} pixels: variance explained {:?}",
        n_bands,
        covariance.sample_count,
        eigen.variance_explained()
    );

    Ok(PcaResult {
        components,
        scores,
        covariance,
        eigen,
        std_devs,
    })
}

/// PCA algorithm: input is a centered grid and the region of the covariance
#[derive(Debug, Clone, Default)]
pub struct Pca;

impl Algorithm for Pca {
    type Input = (Grid, Region);
    type Output = PcaResult;
    type Params = PcaParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PCA"
    }

    fn description(&self) -> &'static str {
        "Principal component analysis of a centered multi-band grid"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (grid, region) = input;
        compute_pca(&grid, &region, &params)
    }
}
