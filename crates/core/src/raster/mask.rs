//! Boolean validity masks

use crate::error::{Error, Result};
use crate::raster::{Grid, GridGeometry};
use ndarray::Array2;

/// A boolean grid: `true` keeps a cell, `false` turns it into no-data.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    cells: Array2<bool>,
    geometry: GridGeometry,
}

impl Mask {
    pub fn new(geometry: GridGeometry, cells: Array2<bool>) -> Result<Self> {
        if cells.dim() != (geometry.rows, geometry.cols) {
            return Err(Error::GeometryMismatch(format!(
                "mask of {}x{} for geometry of {}x{}",
                cells.nrows(),
                cells.ncols(),
                geometry.rows,
                geometry.cols
            )));
        }
        Ok(Self { cells, geometry })
    }

    pub fn filled(geometry: GridGeometry, value: bool) -> Self {
        Self {
            cells: Array2::from_elem((geometry.rows, geometry.cols), value),
            geometry,
        }
    }

    /// Build a mask cell by cell from `(row, col)`
    pub fn from_fn<F>(geometry: GridGeometry, f: F) -> Self
    where
        F: Fn(usize, usize) -> bool,
    {
        Self {
            cells: Array2::from_shape_fn((geometry.rows, geometry.cols), |(r, c)| f(r, c)),
            geometry,
        }
    }

    /// `true` where the band value is finite and satisfies `predicate`
    pub fn from_predicate<F>(grid: &Grid, band: &str, predicate: F) -> Result<Self>
    where
        F: Fn(f64) -> bool,
    {
        let values = grid.band(band)?;
        Ok(Self {
            cells: values.mapv(|v| v.is_finite() && predicate(v)),
            geometry: grid.geometry(),
        })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn cells(&self) -> &Array2<bool> {
        &self.cells
    }

    /// Out-of-range cells read as `false`
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells.get((row, col)).copied().unwrap_or(false)
    }

    /// Number of `true` cells
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&v| v).count()
    }

    /// Cell-wise AND of two aligned masks
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        self.geometry.ensure_aligned(&other.geometry)?;
        let mut cells = self.cells.clone();
        cells.zip_mut_with(&other.cells, |a, &b| *a = *a && b);
        Ok(Self {
            cells,
            geometry: self.geometry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    #[test]
    fn test_mask_from_predicate() {
        let mut elevation = Array2::from_shape_fn((3, 3), |(r, c)| r as f64 * 10.0 - c as f64);
        elevation[(2, 2)] = f64::NAN;
        let grid = Grid::from_bands(GeoTransform::north_up(0.0, 3.0, 1.0), vec![("elevation".into(), elevation)]).unwrap();

        let land = Mask::from_predicate(&grid, "elevation", |v| v > 0.0).unwrap();
        assert!(!land.get(0, 0));
        assert!(land.get(1, 0));
        assert!(!land.get(2, 2), "no-data never passes the predicate");
        assert_eq!(land.count(), 5);
    }

    #[test]
    fn test_mask_and() {
        let geometry = GridGeometry::new(2, 2, GeoTransform::default());
        let left = Mask::from_fn(geometry, |_, c| c == 0);
        let top = Mask::from_fn(geometry, |r, _| r == 0);
        let both = left.and(&top).unwrap();
        assert_eq!(both.count(), 1);
        assert!(both.get(0, 0));
        assert!(!both.get(5, 5));
    }

    #[test]
    fn test_mask_shape_checked() {
        let geometry = GridGeometry::new(2, 2, GeoTransform::default());
        assert!(Mask::new(geometry, Array2::from_elem((3, 2), true)).is_err());
    }
}
