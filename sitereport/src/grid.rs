//! Regular lattice of points around a center.

use crate::SurveyError;
use geo::{coord, Coord};
use log::warn;

/// Rough length of one degree of latitude.
pub const MILES_PER_DEGREE: f64 = 69.0;

/// Largest grid accepted, in points.
pub const MAX_GRID_POINTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub center: Coord,

    /// Points per side.
    pub size: usize,

    /// Distance between neighboring points, in miles.
    pub spacing_miles: f64,
}

impl GridSpec {
    pub fn new(center: Coord, size: usize, spacing_miles: f64) -> Result<Self, SurveyError> {
        let points = size.checked_mul(size).unwrap_or(usize::MAX);
        if size == 0 || points > MAX_GRID_POINTS {
            return Err(SurveyError::InvalidGridSize(size));
        }
        if !(spacing_miles.is_finite() && spacing_miles > 0.0) {
            return Err(SurveyError::InvalidSpacing(spacing_miles));
        }
        Ok(Self {
            center,
            size,
            spacing_miles,
        })
    }

    /// Total number of points.
    pub fn len(&self) -> usize {
        self.size * self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Index of the point treated as the grid center. This is the
    /// exact center only for odd sizes.
    pub fn center_index(&self) -> usize {
        self.len() / 2
    }

    pub fn coords(&self) -> Vec<Coord> {
        grid_coords(self.center, self.size, self.spacing_miles)
    }
}

/// Returns `size`² points spaced `spacing_miles` apart, row-major
/// from the north-west corner.
///
/// Uses an equirectangular approximation. Longitude spacing is
/// scaled by `1/|cos(lat)|`, which blows up approaching the poles.
#[allow(clippy::cast_precision_loss)]
pub fn grid_coords(center: Coord, size: usize, spacing_miles: f64) -> Vec<Coord> {
    let lat_offset = spacing_miles / MILES_PER_DEGREE;
    let lon_offset = spacing_miles / (MILES_PER_DEGREE * center.y.to_radians().cos().abs());

    if !(lon_offset.abs() < 180.0) {
        warn!(
            "degenerate longitude spacing {lon_offset} at latitude {}",
            center.y
        );
    }

    let half = (size as f64 - 1.0) / 2.0;
    let north = center.y + half * lat_offset;
    let west = center.x - half * lon_offset;

    let mut coords = Vec::with_capacity(size * size);
    for row in 0..size {
        for col in 0..size {
            coords.push(coord! {
                x: west + col as f64 * lon_offset,
                y: north - row as f64 * lat_offset,
            });
        }
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::{grid_coords, GridSpec};
    use crate::SurveyError;
    use approx::assert_relative_eq;
    use geo::coord;

    #[test]
    fn test_three_by_three() {
        let center = coord!(x: -123.0, y: 45.0);
        let grid = GridSpec::new(center, 3, 1.0).unwrap();
        let coords = grid.coords();
        assert_eq!(coords.len(), 9);
        assert_eq!(grid.center_index(), 4);

        let mid = coords[grid.center_index()];
        assert_relative_eq!(mid.y, 45.0, epsilon = 1e-12);
        assert_relative_eq!(mid.x, -123.0, epsilon = 1e-12);

        // North-west corner first.
        assert_relative_eq!(coords[0].y, 45.014_49, epsilon = 1e-5);
        assert_relative_eq!(coords[0].x, -123.020_50, epsilon = 1e-5);
        // South-east corner last.
        assert_relative_eq!(coords[8].y, 44.985_51, epsilon = 1e-5);
        assert_relative_eq!(coords[8].x, -122.979_50, epsilon = 1e-5);
    }

    #[test]
    fn test_row_major_order() {
        let coords = grid_coords(coord!(x: 10.0, y: 0.0), 3, 69.0);
        // At the equator both offsets are exactly one degree.
        let expected = [
            (9.0, 1.0),
            (10.0, 1.0),
            (11.0, 1.0),
            (9.0, 0.0),
            (10.0, 0.0),
            (11.0, 0.0),
            (9.0, -1.0),
            (10.0, -1.0),
            (11.0, -1.0),
        ];
        for (actual, (x, y)) in coords.iter().zip(expected) {
            assert_relative_eq!(actual.x, x, epsilon = 1e-12);
            assert_relative_eq!(actual.y, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_points_are_distinct() {
        for size in [1, 3, 5, 7] {
            let coords = grid_coords(coord!(x: -71.3, y: 44.27), size, 0.5);
            assert_eq!(coords.len(), size * size);
            for (i, a) in coords.iter().enumerate() {
                for b in &coords[i + 1..] {
                    assert_ne!(a, b);
                }
            }
        }
    }

    #[test]
    fn test_single_point_is_center() {
        let center = coord!(x: 2.35, y: 48.85);
        assert_eq!(grid_coords(center, 1, 3.0), vec![center]);
    }

    #[test]
    fn test_even_size_center_index() {
        let grid = GridSpec::new(coord!(x: 0.0, y: 0.0), 4, 1.0).unwrap();
        assert_eq!(grid.len(), 16);
        assert_eq!(grid.center_index(), 8);
    }

    #[test]
    fn test_invalid_spec_rejected() {
        let center = coord!(x: 0.0, y: 0.0);
        assert!(GridSpec::new(center, 0, 1.0).is_err());
        assert!(GridSpec::new(center, 3, 0.0).is_err());
        assert!(GridSpec::new(center, 3, f64::NAN).is_err());
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let center = coord!(x: -123.0, y: 45.0);
        assert!(GridSpec::new(center, 100, 1.0).is_ok());
        for size in [101, 70_000, usize::MAX] {
            assert!(matches!(
                GridSpec::new(center, size, 1.0),
                Err(SurveyError::InvalidGridSize(n)) if n == size
            ));
        }
    }

    #[test]
    fn test_nan_propagates() {
        let coords = grid_coords(coord!(x: -123.0, y: 45.0), 3, f64::NAN);
        assert!(coords.iter().all(|c| c.x.is_nan() && c.y.is_nan()));
    }

    #[test]
    fn test_pole_is_not_guarded() {
        let coords = grid_coords(coord!(x: 0.0, y: 90.0), 3, 1.0);
        assert_relative_eq!(coords[4].y, 90.0, epsilon = 1e-9);
        assert!(coords[0].x.abs() > 1e9);
    }
}
