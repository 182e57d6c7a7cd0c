//! Analysis regions
//!
//! A region constrains where clipping and reductions apply. It is either a
//! closed polygon (cells whose center lies inside or on the boundary) or the
//! footprint of a point set (cells containing at least one point).

use crate::error::{Error, Result};
use crate::raster::{GridGeometry, Mask};
use crate::vector::PointSet;
use geo::{BoundingRect, Coord, Intersects, LineString, MultiPoint, Point, Polygon};
use ndarray::Array2;

#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    Polygon(Polygon<f64>),
    Footprint(MultiPoint<f64>),
}

impl Region {
    /// Axis-aligned rectangle
    pub fn bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x >= max_x || min_y >= max_y {
            return Err(Error::InvalidParameter {
                name: "region",
                value: format!("[{}, {}, {}, {}]", min_x, min_y, max_x, max_y),
                reason: "expected finite min_x < max_x and min_y < max_y".into(),
            });
        }
        Ok(Region::Polygon(Polygon::new(
            LineString::from(vec![
                (min_x, min_y),
                (min_x, max_y),
                (max_x, max_y),
                (max_x, min_y),
                (min_x, min_y),
            ]),
            vec![],
        )))
    }

    /// The North Atlantic study area: 80°W–10°E, 0°–60°N
    pub fn north_atlantic() -> Self {
        Region::Polygon(Polygon::new(
            LineString::from(vec![(-80.0, 0.0), (-80.0, 60.0), (10.0, 60.0), (10.0, 0.0), (-80.0, 0.0)]),
            vec![],
        ))
    }

    /// Cells occupied by the given points; non-finite locations are ignored
    pub fn footprint(points: &PointSet) -> Self {
        Region::Footprint(
            points
                .iter()
                .filter(|o| o.has_finite_location())
                .map(|o| Point::new(o.x, o.y))
                .collect(),
        )
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)`, `None` for an empty footprint
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let rect = match self {
            Region::Polygon(p) => p.bounding_rect(),
            Region::Footprint(mp) => mp.bounding_rect(),
        }?;
        Some((rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    /// Whether a map coordinate lies in the region. Footprints only contain
    /// their own points.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let point = Point::new(x, y);
        match self {
            Region::Polygon(p) => p.intersects(&point),
            Region::Footprint(mp) => mp.iter().any(|p| p.0 == Coord { x, y }),
        }
    }

    /// Cells of `geometry` that belong to the region, in row-major order.
    ///
    /// Only the region's window is visited, so the work follows
    /// [`Region::pixel_estimate`] rather than the size of `geometry`.
    pub fn cells(&self, geometry: &GridGeometry) -> Vec<(usize, usize)> {
        match self {
            Region::Polygon(polygon) => match self.bounds().and_then(|b| geometry.window(b)) {
                Some((rows, cols)) => rows
                    .flat_map(move |row| cols.clone().map(move |col| (row, col)))
                    .filter(|&(row, col)| {
                        let (x, y) = geometry.cell_center(row, col);
                        polygon.intersects(&Point::new(x, y))
                    })
                    .collect(),
                None => Vec::new(),
            },
            Region::Footprint(points) => {
                let mut cells: Vec<_> = points.iter().filter_map(|p| geometry.locate(p.x(), p.y())).collect();
                cells.sort_unstable();
                cells.dedup();
                cells
            }
        }
    }

    /// Cells of `geometry` that belong to the region, as a full-size mask
    pub fn mask_for(&self, geometry: &GridGeometry) -> Result<Mask> {
        let mut cells = Array2::from_elem((geometry.rows, geometry.cols), false);
        for cell in self.cells(geometry) {
            cells[cell] = true;
        }
        Mask::new(*geometry, cells)
    }

    /// Upper bound on the number of cells of `geometry` a reduction over this
    /// region would read. Cheap: does not rasterize the region.
    pub fn pixel_estimate(&self, geometry: &GridGeometry) -> u64 {
        let window = match self.bounds().and_then(|b| geometry.window(b)) {
            Some((rows, cols)) => (rows.len() as u64) * (cols.len() as u64),
            None => 0,
        };
        match self {
            Region::Polygon(_) => window,
            Region::Footprint(points) => window.min(points.0.len() as u64),
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Region::north_atlantic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    fn geometry() -> GridGeometry {
        GridGeometry::new(10, 10, GeoTransform::north_up(0.0, 10.0, 1.0))
    }

    #[test]
    fn test_bbox_validation() {
        assert!(Region::bbox(0.0, 0.0, 1.0, 1.0).is_ok());
        assert!(Region::bbox(1.0, 0.0, 1.0, 1.0).is_err());
        assert!(Region::bbox(f64::NAN, 0.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_polygon_mask() {
        let region = Region::bbox(2.0, 2.0, 5.0, 4.0).unwrap();
        let mask = region.mask_for(&geometry()).unwrap();
        // Centers at x = 2.5, 3.5, 4.5 and y = 2.5, 3.5
        assert_eq!(mask.count(), 6);
        assert!(mask.get(6, 2));
        assert!(!mask.get(5, 2));
        assert_eq!(region.pixel_estimate(&geometry()), 6);
    }

    #[test]
    fn test_footprint_mask() {
        let points = PointSet::from_coords([(0.2, 9.8), (0.7, 9.1), (5.5, 5.5), (50.0, 50.0)]);
        let region = Region::footprint(&points);
        let mask = region.mask_for(&geometry()).unwrap();
        assert_eq!(mask.count(), 2);
        assert!(mask.get(0, 0));
        assert!(mask.get(4, 5));
        assert!(region.pixel_estimate(&geometry()) <= 4);
    }

    #[test]
    fn test_cells_stay_within_estimate() {
        // 1000x1000 cells, one point: one cell visited
        let fine = GridGeometry::new(1000, 1000, GeoTransform::north_up(0.0, 10.0, 0.01));
        let region = Region::footprint(&PointSet::from_coords([(3.333, 6.666), (3.334, 6.667)]));
        assert_eq!(region.cells(&fine), vec![(333, 333)]);
        assert!(region.cells(&fine).len() as u64 <= region.pixel_estimate(&fine));

        let bbox = Region::bbox(2.0, 2.0, 5.0, 4.0).unwrap();
        let cells = bbox.cells(&geometry());
        assert_eq!(cells.len() as u64, bbox.pixel_estimate(&geometry()));
        assert!(cells.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_north_atlantic_contains() {
        let region = Region::north_atlantic();
        assert!(region.contains(-40.0, 30.0));
        assert!(region.contains(-80.0, 0.0));
        assert!(!region.contains(20.0, 30.0));
        assert_eq!(region.bounds(), Some((-80.0, 0.0, 10.0, 60.0)));
    }

    #[test]
    fn test_empty_footprint() {
        let region = Region::footprint(&PointSet::new());
        assert_eq!(region.bounds(), None);
        assert_eq!(region.mask_for(&geometry()).unwrap().count(), 0);
        assert_eq!(region.pixel_estimate(&geometry()), 0);
    }
}
