//! Band values at point locations

use nicheprep_core::{Grid, PointSet, Result};
use tracing::debug;

/// One row per retained point, one column per band
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    /// Points outside the grid or with no-data in any band
    pub dropped: usize,
}

impl SampleTable {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }
}

/// Sample every band of `grid` at each point.
///
/// With a `scale`, each point reads the value the grid resampled to that
/// cell size would hold there; only the sampled cells are looked up. A point
/// is dropped when it falls outside the grid or any band is no-data there;
/// rows are never partially filled.
pub fn sample_at_points(grid: &Grid, points: &PointSet, scale: Option<f64>) -> Result<SampleTable> {
    let target = match scale {
        Some(cell_size) => grid.geometry().resampled(cell_size)?,
        None => grid.geometry(),
    };

    let mut rows = Vec::with_capacity(points.len());
    let mut dropped = 0usize;
    for occurrence in points.iter() {
        match grid.sample_on(&target, occurrence.x, occurrence.y) {
            Some(values) if values.iter().all(|v| v.is_finite()) => rows.push(values),
            _ => dropped += 1,
        }
    }

    debug!("sampled {} points, dropped {} incomplete rows", rows.len(), dropped);
    Ok(SampleTable {
        names: grid.band_names().to_vec(),
        rows,
        dropped,
    })
}
