//! One occurrence per grid cell
//!
//! The plane is tessellated into square cells of `cell_size` anchored at
//! `origin`. Occurrences are grouped by cell and one representative per
//! occupied cell survives. Output is ordered by cell (row-major over cell
//! keys), not by input position.

use nicheprep_core::config::METRES_PER_DEGREE;
use nicheprep_core::{Algorithm, Error, GridGeometry, PointSet, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How the surviving occurrence of a cell is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Representative {
    /// The first occurrence of the cell in input order
    #[default]
    First,
    /// A pseudo-random occurrence, reproducible for a given seed
    Seeded(u64),
}

/// Parameters for deduplication
#[derive(Debug, Clone, PartialEq)]
pub struct DedupParams {
    /// Cell edge length, in the units of the point coordinates
    pub cell_size: f64,
    /// Corner the tessellation is anchored at
    pub origin: (f64, f64),
    pub representative: Representative,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self {
            // 10 km in degrees
            cell_size: 10_000.0 / METRES_PER_DEGREE,
            origin: (0.0, 0.0),
            representative: Representative::First,
        }
    }
}

impl DedupParams {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            ..Self::default()
        }
    }

    /// Cells aligned with the corner of `geometry`
    pub fn aligned_with(geometry: &GridGeometry, cell_size: f64) -> Self {
        Self {
            cell_size,
            origin: (geometry.transform.origin_x, geometry.transform.origin_y),
            representative: Representative::First,
        }
    }

    pub fn with_representative(mut self, representative: Representative) -> Self {
        self.representative = representative;
        self
    }
}

/// Integer cell coordinates of `(x, y)`
#[inline]
pub fn cell_key(x: f64, y: f64, cell_size: f64, origin: (f64, f64)) -> (i64, i64) {
    (
        ((x - origin.0) / cell_size).floor() as i64,
        ((y - origin.1) / cell_size).floor() as i64,
    )
}

/// Keep one occurrence per occupied cell.
///
/// Occurrences with a non-finite location belong to no cell and are dropped.
/// Attributes of the survivors are preserved.
///
/// # Errors
/// `InvalidParameter` when `cell_size` is not a positive finite number.
pub fn deduplicate(points: &PointSet, params: &DedupParams) -> Result<PointSet> {
    if !params.cell_size.is_finite() || params.cell_size <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "cell_size",
            value: params.cell_size.to_string(),
            reason: "must be a positive finite number".into(),
        });
    }

    let mut cells: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
    let mut skipped = 0usize;
    for (i, occurrence) in points.iter().enumerate() {
        if !occurrence.has_finite_location() {
            skipped += 1;
            continue;
        }
        let key = cell_key(occurrence.x, occurrence.y, params.cell_size, params.origin);
        cells.entry(key).or_default().push(i);
    }
    if skipped > 0 {
        warn!("{} occurrences without a finite location were dropped", skipped);
    }

    let mut rng = match params.representative {
        Representative::First => None,
        Representative::Seeded(seed) => Some(ChaCha8Rng::seed_from_u64(seed)),
    };

    let survivors: PointSet = cells
        .values()
        .filter_map(|members| {
            let pick = match rng.as_mut() {
                Some(rng) => members[rng.gen_range(0..members.len())],
                None => members[0],
            };
            points.get(pick).cloned()
        })
        .collect();

    debug!(
        "deduplicated {} occurrences into {} cells of size {}",
        points.len(),
        survivors.len(),
        params.cell_size
    );
    Ok(survivors)
}

/// Deduplication algorithm
#[derive(Debug, Clone, Default)]
pub struct Deduplicate;

impl Algorithm for Deduplicate {
    type Input = PointSet;
    type Output = PointSet;
    type Params = DedupParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Deduplicate"
    }

    fn description(&self) -> &'static str {
        "Keep one occurrence per grid cell"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        deduplicate(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nicheprep_core::{AttributeValue, GeoTransform, Occurrence};
    use std::collections::HashSet;

    #[test]
    fn test_two_clusters() {
        let points = PointSet::from_coords([(0.1, 0.1), (0.4, 0.3), (5.2, 5.1), (5.9, 5.8)]);
        let result = deduplicate(&points, &DedupParams::new(1.0)).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.coords(), vec![(0.1, 0.1), (5.2, 5.1)]);
    }

    #[test]
    fn test_negative_coordinates_floor() {
        // -0.5 and 0.5 are in different unit cells
        let points = PointSet::from_coords([(-0.5, 0.5), (0.5, 0.5), (-0.9, 0.2)]);
        let result = deduplicate(&points, &DedupParams::new(1.0)).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(cell_key(-0.5, 0.5, 1.0, (0.0, 0.0)), (-1, 0));
    }

    #[test]
    fn test_origin_shifts_cells() {
        let points = PointSet::from_coords([(0.9, 0.5), (1.1, 0.5)]);
        assert_eq!(deduplicate(&points, &DedupParams::new(1.0)).unwrap().len(), 2);

        let shifted = DedupParams {
            origin: (0.5, 0.0),
            ..DedupParams::new(1.0)
        };
        assert_eq!(deduplicate(&points, &shifted).unwrap().len(), 1);
    }

    #[test]
    fn test_aligned_with_grid() {
        let geometry = GridGeometry::new(10, 10, GeoTransform::north_up(0.25, 10.0, 0.5));
        let params = DedupParams::aligned_with(&geometry, 0.5);
        assert_eq!(params.origin, (0.25, 10.0));
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let points: PointSet = (0..50)
            .map(|i| Occurrence::new(0.01 * i as f64, 0.5).with_property("id", AttributeValue::Int(i)))
            .collect();
        let params = DedupParams::new(1.0).with_representative(Representative::Seeded(42));

        let a = deduplicate(&points, &params).unwrap();
        let b = deduplicate(&points, &params).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_properties_preserved_and_cells_distinct() {
        let points: PointSet = (0..200)
            .map(|i| {
                let x = (i * 37 % 101) as f64 * 0.13 - 6.0;
                let y = (i * 53 % 97) as f64 * 0.11 - 5.0;
                Occurrence::new(x, y).with_property("id", AttributeValue::Int(i))
            })
            .collect();
        let params = DedupParams::new(0.75);
        let result = deduplicate(&points, &params).unwrap();

        let input_cells: HashSet<_> = points
            .iter()
            .map(|o| cell_key(o.x, o.y, 0.75, (0.0, 0.0)))
            .collect();
        let output_cells: HashSet<_> = result
            .iter()
            .map(|o| cell_key(o.x, o.y, 0.75, (0.0, 0.0)))
            .collect();

        assert_eq!(result.len(), output_cells.len());
        assert_eq!(output_cells, input_cells);
        assert!(result.iter().all(|o| o.get_property("id").is_some()));
    }

    #[test]
    fn test_empty_and_invalid() {
        let empty = deduplicate(&PointSet::new(), &DedupParams::default()).unwrap();
        assert!(empty.is_empty());

        let points = PointSet::from_coords([(f64::NAN, 1.0), (1.0, 1.0)]);
        assert_eq!(Deduplicate.execute_default(points.clone()).unwrap().len(), 1);

        assert!(deduplicate(&points, &DedupParams::new(0.0)).is_err());
        assert!(deduplicate(&points, &DedupParams::new(f64::NAN)).is_err());
    }
}
