//! Masking and clipping

use nicheprep_core::{Algorithm, Error, Grid, Mask, Region, Result};

/// Turn every cell where `mask` is false into no-data, in all bands
///
/// # Errors
/// `GeometryMismatch` when the mask was built for a different geometry.
pub fn update_mask(grid: &Grid, mask: &Mask) -> Result<Grid> {
    grid.geometry().ensure_aligned(mask.geometry())?;
    let mut data = grid.data().clone();
    for mut band in data.outer_iter_mut() {
        band.zip_mut_with(mask.cells(), |v, &keep| {
            if !keep {
                *v = f64::NAN;
            }
        });
    }
    grid.with_data(grid.band_names().to_vec(), data)
}

/// Keep cells where `band` is finite and satisfies `predicate`
pub fn mask_where<F>(grid: &Grid, band: &str, predicate: F) -> Result<Grid>
where
    F: Fn(f64) -> bool,
{
    let mask = Mask::from_predicate(grid, band, predicate)?;
    update_mask(grid, &mask)
}

/// Restrict a grid to a region; cells outside become no-data.
///
/// The geometry is unchanged, so clipped grids stay aligned with their source.
pub fn clip(grid: &Grid, region: &Region) -> Result<Grid> {
    let mask = region.mask_for(&grid.geometry())?;
    update_mask(grid, &mask)
}

/// Clip algorithm
#[derive(Debug, Clone, Default)]
pub struct Clip;

impl Algorithm for Clip {
    type Input = Grid;
    type Output = Grid;
    type Params = Region;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Clip"
    }

    fn description(&self) -> &'static str {
        "Set cells outside a region to no-data"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        clip(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use nicheprep_core::GeoTransform;

    fn terrain() -> Grid {
        // Elevation below zero in the first column
        let elevation = Array2::from_shape_fn((4, 4), |(r, c)| c as f64 * 10.0 - 5.0 + r as f64);
        let temp = Array2::from_elem((4, 4), 20.0);
        Grid::from_bands(
            GeoTransform::north_up(0.0, 4.0, 1.0),
            vec![("elevation".into(), elevation), ("bio01".into(), temp)],
        )
        .unwrap()
    }

    #[test]
    fn test_mask_where_applies_to_all_bands() {
        let masked = mask_where(&terrain(), "elevation", |v| v > 0.0).unwrap();
        for row in 0..4 {
            assert!(!masked.is_valid_pixel(row, 0));
            assert!(masked.band("bio01").unwrap()[(row, 0)].is_nan());
            assert!(masked.is_valid_pixel(row, 1));
        }
        assert_eq!(masked.valid_pixel_count(), 12);
    }

    #[test]
    fn test_clip_keeps_geometry() {
        let grid = terrain();
        let region = Region::bbox(1.0, 1.0, 3.0, 3.0).unwrap();
        let clipped = Clip.execute(grid.clone(), region).unwrap();
        assert_eq!(clipped.geometry(), grid.geometry());
        assert_eq!(clipped.valid_pixel_count(), 4);
        assert!(clipped.is_valid_pixel(1, 1));
        assert!(!clipped.is_valid_pixel(0, 0));
    }

    #[test]
    fn test_clip_outside_region_is_all_nodata() {
        let region = Region::bbox(100.0, 100.0, 101.0, 101.0).unwrap();
        let clipped = clip(&terrain(), &region).unwrap();
        assert_eq!(clipped.valid_pixel_count(), 0);
    }

    #[test]
    fn test_update_mask_rejects_other_geometry() {
        let grid = terrain();
        let other = nicheprep_core::GridGeometry::new(3, 3, *grid.transform());
        let result = update_mask(&grid, &Mask::filled(other, true));
        assert!(matches!(result, Err(Error::GeometryMismatch(_))));
    }
}
