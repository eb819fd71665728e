//! Polylines (road centrelines).

use super::{Bounds, Point};
use serde::{Deserialize, Serialize};

/// Open polyline in projected metres.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineString {
    points: Vec<Point>,
}

impl LineString {
    /// Wrap a vertex list.
    #[must_use]
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Build from `(x, y)` tuples.
    #[must_use]
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    /// Vertices in order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Total length; segments with non-finite endpoints contribute nothing.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| nalgebra::distance(&w[0], &w[1]))
            .filter(|d| d.is_finite())
            .sum()
    }

    /// Point at arc-length `distance` from the start, clamped to the line.
    ///
    /// `None` for an empty line.
    #[must_use]
    pub fn interpolate(&self, distance: f64) -> Option<Point> {
        let first = *self.points.first()?;
        if distance <= 0.0 {
            return Some(first);
        }
        let mut remaining = distance;
        for w in self.points.windows(2) {
            let seg = nalgebra::distance(&w[0], &w[1]);
            if !seg.is_finite() {
                continue;
            }
            if remaining <= seg {
                if seg == 0.0 {
                    return Some(w[0]);
                }
                let t = remaining / seg;
                return Some(w[0] + (w[1] - w[0]) * t);
            }
            remaining -= seg;
        }
        self.points.last().copied()
    }

    /// Bounding box, `None` for an empty line.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn length_sums_segments() {
        let line = LineString::from_coords(&[(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        assert_relative_eq!(line.length(), 11.0);
        assert_eq!(LineString::default().length(), 0.0);
    }

    #[test]
    fn interpolation_walks_segments() {
        let line = LineString::from_coords(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let p = line.interpolate(15.0).unwrap();
        assert_relative_eq!(p.x, 10.0);
        assert_relative_eq!(p.y, 5.0);

        let start = line.interpolate(-1.0).unwrap();
        assert_eq!(start, Point::new(0.0, 0.0));

        let end = line.interpolate(1e6).unwrap();
        assert_eq!(end, Point::new(10.0, 10.0));

        assert!(LineString::default().interpolate(1.0).is_none());
    }
}
