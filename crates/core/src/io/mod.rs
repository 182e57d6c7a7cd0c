//! I/O for the data-access layer: GeoTIFF bands and occurrence CSV files

mod geotiff;
mod points;

pub use geotiff::{
    read_band, read_band_from_reader, read_grid, write_band, write_band_to_writer, write_grid,
    GeoTiffOptions,
};
pub use points::{read_points, read_points_from_reader, write_points, write_points_to_writer};
