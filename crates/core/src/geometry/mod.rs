//! Planar geometry for site polygons and urban features.
//!
//! Site polygons arrive as WGS84 longitude/latitude rings and are repaired,
//! then projected to UTM metres. Everything downstream (receptor grid,
//! road interpolation, industry parcel areas) works in projected metres.

mod line;
mod polygon;
mod projection;

pub use line::LineString;
pub use polygon::Polygon;
pub use projection::UtmProjection;

use serde::{Deserialize, Serialize};

/// Planar point (projected metres, or lon/lat degrees before projection).
pub type Point = nalgebra::Point2<f64>;

/// Planar displacement between two [`Point`]s.
pub type Vector = nalgebra::Vector2<f64>;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum x (m)
    pub min_x: f64,
    /// Minimum y (m)
    pub min_y: f64,
    /// Maximum x (m)
    pub max_x: f64,
    /// Maximum y (m)
    pub max_y: f64,
}

impl Bounds {
    /// Tight bounds around a set of points, `None` when empty.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Some(bounds)
    }

    /// Width along x (m).
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height along y (m).
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Bounds grown by `distance` on every side.
    #[must_use]
    pub fn expanded(&self, distance: f64) -> Self {
        Bounds {
            min_x: self.min_x - distance,
            min_y: self.min_y - distance,
            max_x: self.max_x + distance,
            max_y: self.max_y + distance,
        }
    }

    /// True when the two boxes overlap (touching edges count).
    #[must_use]
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// True when `p` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, p: &Point) -> bool {
        (self.min_x..=self.max_x).contains(&p.x) && (self.min_y..=self.max_y).contains(&p.y)
    }

    /// The box as a counter-clockwise polygon.
    #[must_use]
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(vec![
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ])
    }
}
