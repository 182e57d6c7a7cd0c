//! Mean and covariance reductions over a region
//!
//! A reduction first checks the number of cells the region covers at the
//! requested scale against the pixel budget, and only then reads pixel
//! values. Cells are looked up in the source grid one by one (nearest
//! neighbour under each cell center), so a small region at a fine scale
//! never materializes a resampled copy of the whole grid. Per-row partial
//! sums are combined in row order so the parallel and sequential builds give
//! the same result.

use crate::maybe_rayon::*;
use ndarray::Array2;
use nicheprep_core::{Error, Grid, Region, Result};
use serde::Serialize;
use tracing::debug;

/// Default pixel budget of a reduction
pub const DEFAULT_MAX_PIXELS: u64 = 1_000_000_000;

/// Parameters shared by region reductions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReduceParams {
    /// Cell size the reduction runs at, in grid units; `None` keeps the
    /// grid's own resolution
    pub scale: Option<f64>,
    /// Maximum number of cells a reduction may read
    pub max_pixels: u64,
}

impl Default for ReduceParams {
    fn default() -> Self {
        Self {
            scale: None,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl ReduceParams {
    pub fn at_scale(scale: f64, max_pixels: u64) -> Self {
        Self {
            scale: Some(scale),
            max_pixels,
        }
    }
}

/// Band×band centered covariance over a region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CovarianceMatrix {
    pub names: Vec<String>,
    pub matrix: Array2<f64>,
    /// Pixels that entered the reduction
    pub sample_count: usize,
}

impl CovarianceMatrix {
    pub fn n_bands(&self) -> usize {
        self.names.len()
    }

    /// Sum of the diagonal
    pub fn trace(&self) -> f64 {
        self.matrix.diag().sum()
    }
}

/// Source cells a reduction reads, grouped by row of the reduction grid
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RegionCells {
    rows: Vec<Vec<(usize, usize)>>,
}

impl RegionCells {
    /// Number of source cells read
    pub(crate) fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

/// Resolve the region's cells at the reduction scale, failing early when
/// the region covers more cells than the budget allows.
pub(crate) fn region_cells(grid: &Grid, region: &Region, params: &ReduceParams) -> Result<RegionCells> {
    let source = grid.geometry();
    let target = match params.scale {
        Some(scale) => source.resampled(scale)?,
        None => source,
    };

    let required = region.pixel_estimate(&target);
    if required > params.max_pixels {
        return Err(Error::ResourceExceeded {
            required,
            budget: params.max_pixels,
        });
    }
    debug!(
        "reduction over at most {} cells of a {}x{} grid (cell size {})",
        required,
        target.rows,
        target.cols,
        target.cell_size()
    );

    // Cells arrive in row-major order
    let mut rows: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut current = None;
    for (row, col) in region.cells(&target) {
        let Some(cell) = source.source_cell(&target, row, col) else {
            continue;
        };
        if current != Some(row) {
            rows.push(Vec::new());
            current = Some(row);
        }
        if let Some(last) = rows.last_mut() {
            last.push(cell);
        }
    }
    Ok(RegionCells { rows })
}

/// Mean of each band over the cells of `region` where that band is valid.
///
/// # Errors
/// - `ResourceExceeded` when the region exceeds `params.max_pixels`
/// - `InsufficientData` when a band has no valid cell inside the region
pub fn region_mean(grid: &Grid, region: &Region, params: &ReduceParams) -> Result<Vec<f64>> {
    let cells = region_cells(grid, region, params)?;
    let n_bands = grid.n_bands();
    let data = grid.data();

    let partials: Vec<(Vec<f64>, Vec<usize>)> = (&cells.rows)
        .into_par_iter()
        .map(|row| {
            let mut sums = vec![0.0; n_bands];
            let mut counts = vec![0usize; n_bands];
            for &(r, c) in row {
                for b in 0..n_bands {
                    let v = data[[b, r, c]];
                    if v.is_finite() {
                        sums[b] += v;
                        counts[b] += 1;
                    }
                }
            }
            (sums, counts)
        })
        .collect();

    let mut sums = vec![0.0; n_bands];
    let mut counts = vec![0usize; n_bands];
    for (row_sums, row_counts) in &partials {
        for b in 0..n_bands {
            sums[b] += row_sums[b];
            counts[b] += row_counts[b];
        }
    }

    if let Some(b) = counts.iter().position(|&c| c == 0) {
        return Err(Error::InsufficientData {
            needed: 1,
            found: 0,
            context: format!("mean of band '{}' over the region", grid.band_names()[b]),
        });
    }

    Ok(sums.iter().zip(&counts).map(|(s, &c)| s / c as f64).collect())
}

/// Centered covariance of already-centered bands over the cells of `region`
/// where every band is valid: `Σ x·xᵀ / (n − 1)`.
///
/// No mean is subtracted here. Centering is the caller's job (see
/// `pca::center`), and the values are taken as deviations from that mean
/// even when it was computed over other pixels or at another scale.
///
/// # Errors
/// - `ResourceExceeded` when the region exceeds `params.max_pixels`
/// - `InsufficientData` when fewer pixels than bands (or fewer than two)
///   are valid inside the region
pub fn region_covariance(grid: &Grid, region: &Region, params: &ReduceParams) -> Result<CovarianceMatrix> {
    let cells = region_cells(grid, region, params)?;
    let n_bands = grid.n_bands();
    let data = grid.data();

    // Upper triangle of the cross-products, per row
    let partials: Vec<(Array2<f64>, usize)> = (&cells.rows)
        .into_par_iter()
        .map(|row| {
            let mut acc = Array2::<f64>::zeros((n_bands, n_bands));
            let mut count = 0usize;
            let mut x = vec![0.0; n_bands];
            for &(r, c) in row {
                if !grid.is_valid_pixel(r, c) {
                    continue;
                }
                for (b, v) in x.iter_mut().enumerate() {
                    *v = data[[b, r, c]];
                }
                for i in 0..n_bands {
                    for j in i..n_bands {
                        acc[(i, j)] += x[i] * x[j];
                    }
                }
                count += 1;
            }
            (acc, count)
        })
        .collect();

    let mut matrix = Array2::<f64>::zeros((n_bands, n_bands));
    let mut n = 0usize;
    for (acc, count) in &partials {
        matrix += acc;
        n += count;
    }

    let needed = n_bands.max(2);
    if n < needed {
        return Err(Error::InsufficientData {
            needed,
            found: n,
            context: format!("covariance of {} bands", n_bands),
        });
    }

    let denom = (n - 1) as f64;
    for i in 0..n_bands {
        for j in i..n_bands {
            let v = matrix[(i, j)] / denom;
            matrix[(i, j)] = v;
            matrix[(j, i)] = v;
        }
    }

    debug!("covariance of {} bands over {} pixels", n_bands, n);
    Ok(CovarianceMatrix {
        names: grid.band_names().to_vec(),
        matrix,
        sample_count: n,
    })
}
