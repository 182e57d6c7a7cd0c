//! Raster data structures: georeferencing, multi-band grids and masks

mod geotransform;
mod grid;
mod mask;

pub use geotransform::GeoTransform;
pub use grid::{BandStatistics, Grid, GridGeometry};
pub use mask::Mask;
