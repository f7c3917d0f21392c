//! Flat-earth geometry used by the proximity scanner.
//!
//! Horizontal distance is the Euclidean distance in degree space, scaled by
//! a single miles-per-degree constant for both axes. Longitude is not
//! shortened with latitude, so east-west separations are overstated away
//! from the equator. Together with 4-decimal coordinate quantization
//! (~11 m) this makes go/no-go decisions within a few tens of feet of the
//! threshold unreliable. It is a known approximation, not a geodesic.

use std::collections::HashMap;

pub const FEET_PER_MILE: f64 = 5280.0;

/// Euclidean distance between two points in degree space.
pub fn planar_distance_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    (lat1 - lat2).hypot(lon1 - lon2)
}

pub fn degrees_to_miles(degrees: f64, miles_per_degree: f64) -> f64 {
    degrees * miles_per_degree
}

pub fn miles_to_feet(miles: f64) -> f64 {
    miles * FEET_PER_MILE
}

/// Round to a fixed number of decimal places.
pub fn quantize(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

// Cells are padded slightly so that two points exactly one threshold apart
// never land two cells apart after floating point division.
const CELL_PADDING: f64 = 1.0 + 1e-9;

/// Uniform lat/lon grid over the records of one time bucket.
///
/// Cell edges are at least the horizontal threshold, so every point within
/// the threshold of a query lies in the query's cell or one of its eight
/// neighbours.
#[derive(Debug)]
pub struct BucketGrid {
    cell_deg: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl BucketGrid {
    /// Returns `None` when the threshold is too small to size a grid.
    pub fn build(
        points: impl IntoIterator<Item = (usize, f64, f64)>,
        threshold_deg: f64,
    ) -> Option<Self> {
        if !threshold_deg.is_finite() || threshold_deg <= 0.0 {
            return None;
        }
        let cell_deg = threshold_deg * CELL_PADDING;
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (idx, lat, lon) in points {
            cells
                .entry(cell_of(lat, lon, cell_deg))
                .or_default()
                .push(idx);
        }
        Some(Self { cell_deg, cells })
    }

    /// Collect indices from the 3x3 block around `(lat, lon)` into `out`,
    /// sorted ascending so results follow table order.
    pub fn neighbours(&self, lat: f64, lon: f64, out: &mut Vec<usize>) {
        out.clear();
        let (cy, cx) = cell_of(lat, lon, self.cell_deg);
        for dy in -1..=1 {
            for dx in -1..=1 {
                // Tiny cells saturate the index at the i64 edge; no cells lie beyond it.
                let (Some(y), Some(x)) = (cy.checked_add(dy), cx.checked_add(dx)) else {
                    continue;
                };
                if let Some(indices) = self.cells.get(&(y, x)) {
                    out.extend_from_slice(indices);
                }
            }
        }
        out.sort_unstable();
    }
}

fn cell_of(lat: f64, lon: f64, cell_deg: f64) -> (i64, i64) {
    (
        (lat / cell_deg).floor() as i64,
        (lon / cell_deg).floor() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_distance_is_pythagorean() {
        let d = planar_distance_deg(0.0, 0.0, 0.0003, 0.0004);
        assert!((d - 0.0005).abs() < 1e-12);
    }

    #[test]
    fn one_degree_is_sixty_nine_miles() {
        let feet = miles_to_feet(degrees_to_miles(1.0, 69.0));
        assert!((feet - 364_320.0).abs() < 1e-6);
    }

    #[test]
    fn quantize_rounds_to_four_places() {
        assert_eq!(quantize(28.123_449, 4), 28.1234);
        assert_eq!(quantize(-80.987_66, 4), -80.9877);
    }

    #[test]
    fn grid_finds_points_across_cell_boundaries() {
        let threshold = 0.001;
        let points = vec![
            (0, 10.0, 20.0),
            (1, 10.0 + threshold, 20.0),
            (2, 10.0, 20.0 - threshold),
            (3, 10.0 + 3.0 * threshold, 20.0),
        ];
        let grid = BucketGrid::build(points, threshold).unwrap();
        let mut out = Vec::new();
        grid.neighbours(10.0, 20.0, &mut out);
        assert_eq!(out, vec![0, 1, 2]);
    }

    #[test]
    fn saturated_cell_indices_do_not_overflow() {
        let points = vec![(0, 28.5, -81.3), (1, 28.5, -81.3), (2, -28.5, 81.3)];
        let grid = BucketGrid::build(points, 1e-20).unwrap();
        let mut out = Vec::new();
        grid.neighbours(28.5, -81.3, &mut out);
        assert_eq!(out, vec![0, 1]);
        grid.neighbours(-28.5, 81.3, &mut out);
        assert_eq!(out, vec![2]);
    }

    #[test]
    fn zero_threshold_has_no_grid() {
        assert!(BucketGrid::build(vec![(0, 1.0, 1.0)], 0.0).is_none());
    }
}
