//! Multi-band grid type

use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

/// Shape and georeferencing shared by every band of a [`Grid`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
}

impl GridGeometry {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self { rows, cols, transform }
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols, self.rows)
    }

    /// Map coordinates of a cell center
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// `(row, col)` of the cell containing a map coordinate, if inside the grid
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (c, r) = self.transform.geo_to_pixel(x, y);
        if !c.is_finite() || !r.is_finite() || c < 0.0 || r < 0.0 {
            return None;
        }
        let (row, col) = (r.floor() as usize, c.floor() as usize);
        (row < self.rows && col < self.cols).then_some((row, col))
    }

    /// Same shape and georeferencing
    pub fn is_aligned_with(&self, other: &GridGeometry) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.transform.approx_eq(&other.transform)
    }

    pub fn ensure_aligned(&self, other: &GridGeometry) -> Result<()> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(Error::GeometryMismatch(format!(
                "grid of {}x{} vs grid of {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        if !self.transform.approx_eq(&other.transform) {
            return Err(Error::GeometryMismatch(format!(
                "transform {:?} vs {:?}",
                self.transform, other.transform
            )));
        }
        Ok(())
    }

    /// Geometry covering the same extent with square cells of `cell_size`.
    ///
    /// The origin is kept; the last row/column may extend past the original
    /// extent when the extent is not a multiple of the new cell size.
    pub fn resampled(&self, cell_size: f64) -> Result<GridGeometry> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "cell_size",
                value: cell_size.to_string(),
                reason: "must be a positive finite number".into(),
            });
        }
        if (cell_size - self.cell_size()).abs() <= 1e-12 * cell_size {
            return Ok(*self);
        }
        let (min_x, min_y, max_x, max_y) = self.bounds();
        let cols = (((max_x - min_x) / cell_size) - 1e-9).ceil().max(1.0) as usize;
        let rows = (((max_y - min_y) / cell_size) - 1e-9).ceil().max(1.0) as usize;
        Ok(GridGeometry::new(rows, cols, self.transform.with_cell_size(cell_size)))
    }

    /// Cell of `self` under the center of cell `(row, col)` of `target`.
    ///
    /// This is the nearest-neighbour lookup behind resampling; `None` when
    /// the center falls outside `self`.
    pub fn source_cell(&self, target: &GridGeometry, row: usize, col: usize) -> Option<(usize, usize)> {
        if target == self {
            return (row < self.rows && col < self.cols).then_some((row, col));
        }
        let (x, y) = target.cell_center(row, col);
        self.locate(x, y)
    }

    /// Row and column ranges of the cells intersecting a bounding box
    pub fn window(&self, bounds: (f64, f64, f64, f64)) -> Option<(Range<usize>, Range<usize>)> {
        let (gx0, gy0, gx1, gy1) = self.bounds();
        let (bx0, by0, bx1, by1) = bounds;
        let (x0, y0, x1, y1) = (bx0.max(gx0), by0.max(gy0), bx1.min(gx1), by1.min(gy1));
        if x0 > x1 || y0 > y1 {
            return None;
        }

        let (c0, r0) = self.transform.geo_to_pixel(x0, y0);
        let (c1, r1) = self.transform.geo_to_pixel(x1, y1);
        let span = |a: f64, b: f64, n: usize| -> Range<usize> {
            let start = (a.min(b).floor().max(0.0) as usize).min(n.saturating_sub(1));
            let end = (a.max(b).ceil().max(0.0) as usize).clamp(start + 1, n);
            start..end
        };
        Some((span(r0, r1, self.rows), span(c0, c1, self.cols)))
    }
}

/// A georeferenced raster with one or more named `f64` bands.
///
/// Samples are stored band-major as `(band, row, col)`. No-data is NaN.
/// Grids are treated as values: every transformation returns a new `Grid`.
///
/// # Example
///
/// ```ignore
/// use nicheprep_core::{GeoTransform, Grid};
/// use ndarray::Array2;
///
/// let t = GeoTransform::north_up(-80.0, 60.0, 0.1);
/// let grid = Grid::from_bands(t, vec![
///     ("bio01".to_string(), Array2::zeros((600, 900))),
///     ("bio12".to_string(), Array2::zeros((600, 900))),
/// ])?;
/// let bio01 = grid.band("bio01")?;
/// ```
#[derive(Debug, Clone)]
pub struct Grid {
    data: Array3<f64>,
    names: Vec<String>,
    transform: GeoTransform,
}

impl Grid {
    /// Create a grid from a `(band, row, col)` array and one name per band
    pub fn new(transform: GeoTransform, names: Vec<String>, data: Array3<f64>) -> Result<Self> {
        let (bands, rows, cols) = data.dim();
        if bands == 0 || rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions { bands, rows, cols });
        }
        if names.len() != bands {
            return Err(Error::GeometryMismatch(format!(
                "{} band names for {} bands",
                names.len(),
                bands
            )));
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateBand(name.clone()));
            }
        }
        Ok(Self { data, names, transform })
    }

    /// Create a grid from named 2-D bands of identical shape
    pub fn from_bands(transform: GeoTransform, bands: Vec<(String, Array2<f64>)>) -> Result<Self> {
        let (names, arrays): (Vec<String>, Vec<Array2<f64>>) = bands.into_iter().unzip();
        Self::from_band_arrays(transform, names, arrays)
    }

    /// Create a grid from parallel name and band vectors
    pub fn from_band_arrays(
        transform: GeoTransform,
        names: Vec<String>,
        arrays: Vec<Array2<f64>>,
    ) -> Result<Self> {
        let first = arrays.first().ok_or(Error::InvalidDimensions {
            bands: 0,
            rows: 0,
            cols: 0,
        })?;
        let shape = first.dim();
        if let Some(bad) = arrays.iter().find(|a| a.dim() != shape) {
            return Err(Error::GeometryMismatch(format!(
                "band of {}x{} vs band of {}x{}",
                shape.0,
                shape.1,
                bad.nrows(),
                bad.ncols()
            )));
        }
        let views: Vec<ArrayView2<'_, f64>> = arrays.iter().map(|a| a.view()).collect();
        let data = ndarray::stack(Axis(0), &views)?;
        Self::new(transform, names, data)
    }

    /// A single-band grid filled with one value
    pub fn filled(geometry: GridGeometry, name: impl Into<String>, value: f64) -> Result<Self> {
        let data = Array3::from_elem((1, geometry.rows, geometry.cols), value);
        Self::new(geometry.transform, vec![name.into()], data)
    }

    // Dimensions

    pub fn n_bands(&self) -> usize {
        self.data.dim().0
    }

    pub fn rows(&self) -> usize {
        self.data.dim().1
    }

    pub fn cols(&self) -> usize {
        self.data.dim().2
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.rows(), self.cols(), self.transform)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.geometry().bounds()
    }

    // Bands

    pub fn band_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn band_index(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::BandNotFound(name.to_string()))
    }

    pub fn band(&self, name: &str) -> Result<ArrayView2<'_, f64>> {
        let index = self.band_index(name)?;
        Ok(self.band_at(index))
    }

    /// Band by position. Panics if `index >= n_bands()`.
    pub fn band_at(&self, index: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), index)
    }

    /// The underlying `(band, row, col)` array
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn into_parts(self) -> (GeoTransform, Vec<String>, Array3<f64>) {
        (self.transform, self.names, self.data)
    }

    // Pixels

    /// All band values of one pixel
    pub fn pixel(&self, row: usize, col: usize) -> Result<ArrayView1<'_, f64>> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(self.data.slice(s![.., row, col]))
    }

    /// A pixel is valid when every band holds a finite value
    pub fn is_valid_pixel(&self, row: usize, col: usize) -> bool {
        row < self.rows()
            && col < self.cols()
            && self.data.slice(s![.., row, col]).iter().all(|v| v.is_finite())
    }

    pub fn valid_pixel_count(&self) -> usize {
        let (rows, cols) = self.shape();
        (0..rows)
            .map(|r| (0..cols).filter(|&c| self.is_valid_pixel(r, c)).count())
            .sum()
    }

    /// Band values of the cell containing `(x, y)`, or `None` outside the grid
    pub fn sample(&self, x: f64, y: f64) -> Option<Vec<f64>> {
        let (row, col) = self.geometry().locate(x, y)?;
        Some(self.data.slice(s![.., row, col]).to_vec())
    }

    /// Values of every band at a map coordinate as read from this grid
    /// resampled onto `target`, without resampling the whole grid
    pub fn sample_on(&self, target: &GridGeometry, x: f64, y: f64) -> Option<Vec<f64>> {
        let (row, col) = target.locate(x, y)?;
        let (sr, sc) = self.geometry().source_cell(target, row, col)?;
        Some(self.data.slice(s![.., sr, sc]).to_vec())
    }

    // Transformations

    /// Same geometry, new bands
    pub fn with_data(&self, names: Vec<String>, data: Array3<f64>) -> Result<Self> {
        let (_, rows, cols) = data.dim();
        if (rows, cols) != self.shape() {
            return Err(Error::GeometryMismatch(format!(
                "data of {}x{} for grid of {}x{}",
                rows,
                cols,
                self.rows(),
                self.cols()
            )));
        }
        Self::new(self.transform, names, data)
    }

    /// Keep the named bands, in the order given
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|n| self.band_index(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let data = self.data.select(Axis(0), &indices);
        let names = indices.iter().map(|&i| self.names[i].clone()).collect();
        Self::new(self.transform, names, data)
    }

    /// Append the bands of `other`, which must share this grid's geometry
    pub fn add_bands(&self, other: &Grid) -> Result<Self> {
        self.geometry().ensure_aligned(&other.geometry())?;
        let data = ndarray::concatenate(Axis(0), &[self.data.view(), other.data.view()])?;
        let names = self.names.iter().chain(other.names.iter()).cloned().collect();
        Self::new(self.transform, names, data)
    }

    pub fn rename(&self, names: Vec<String>) -> Result<Self> {
        Self::new(self.transform, names, self.data.clone())
    }

    /// Nearest-neighbour resampling onto square cells of `cell_size`.
    ///
    /// Each output cell takes the value of the input cell containing its
    /// center; cells whose center falls outside the input are no-data.
    pub fn resample(&self, cell_size: f64) -> Result<Self> {
        let source = self.geometry();
        let target = source.resampled(cell_size)?;
        if target == source {
            return Ok(self.clone());
        }
        let data = Array3::from_shape_fn((self.n_bands(), target.rows, target.cols), |(b, r, c)| {
            match source.source_cell(&target, r, c) {
                Some((sr, sc)) => self.data[[b, sr, sc]],
                None => f64::NAN,
            }
        });
        Self::new(target.transform, self.names.clone(), data)
    }

    // Statistics

    /// Min, max, mean and valid count of one band
    pub fn band_statistics(&self, name: &str) -> Result<BandStatistics> {
        let band = self.band(name)?;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for &v in band.iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        Ok(BandStatistics {
            min: (count > 0).then_some(min),
            max: (count > 0).then_some(max),
            mean: (count > 0).then(|| sum / count as f64),
            valid_count: count,
            nodata_count: band.len() - count,
        })
    }
}

/// Basic statistics for one band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
