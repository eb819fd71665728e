//! Simple polygons: area, centroid, repair and clipping.

use super::{Bounds, LineString, Point, UtmProjection};
use crate::error::{PlumeError, PlumeResult};
use serde::{Deserialize, Serialize};

/// Areas below this are treated as degenerate (units²).
const MIN_AREA: f64 = 1e-12;

/// Polygon stored as an open ring (the closing vertex is not repeated).
///
/// Serialized as a bare array of `[x, y]` pairs, matching GeoJSON ring
/// coordinates. A closed ring on input is accepted; [`Polygon::repaired`]
/// drops the duplicate closing vertex.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    exterior: Vec<Point>,
}

impl Polygon {
    /// Wrap a ring without validation.
    #[must_use]
    pub fn new(exterior: Vec<Point>) -> Self {
        Self { exterior }
    }

    /// Build from `(lon, lat)` or `(x, y)` tuples.
    #[must_use]
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    /// Ring vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        &self.exterior
    }

    /// Iterate over ring edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.exterior.len();
        (0..n).map(move |i| (self.exterior[i], self.exterior[(i + 1) % n]))
    }

    /// Shoelace signed area; positive for counter-clockwise rings.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        if self.exterior.len() < 3 {
            return 0.0;
        }
        0.5 * self
            .edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
    }

    /// Absolute enclosed area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Area-weighted centroid. Degenerate rings fall back to the vertex mean.
    #[must_use]
    pub fn centroid(&self) -> Option<Point> {
        if self.exterior.is_empty() {
            return None;
        }
        let area = self.signed_area();
        if area.abs() < MIN_AREA {
            let n = self.exterior.len() as f64;
            let (sx, sy) = self
                .exterior
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
            return Some(Point::new(sx / n, sy / n));
        }

        // Shift to the first vertex to keep the cross products well-conditioned
        // for UTM-sized coordinates.
        let origin = self.exterior[0];
        let (mut cx, mut cy) = (0.0, 0.0);
        for (a, b) in self.edges() {
            let (ax, ay) = (a.x - origin.x, a.y - origin.y);
            let (bx, by) = (b.x - origin.x, b.y - origin.y);
            let cross = ax * by - bx * ay;
            cx += (ax + bx) * cross;
            cy += (ay + by) * cross;
        }
        let factor = 1.0 / (6.0 * area);
        Some(Point::new(origin.x + cx * factor, origin.y + cy * factor))
    }

    /// Bounding box, `None` for an empty ring.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.exterior)
    }

    /// Even-odd point-in-polygon test.
    #[must_use]
    pub fn contains_point(&self, p: &Point) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// True when the two rings overlap, touch, or one contains the other.
    #[must_use]
    pub fn intersects(&self, other: &Polygon) -> bool {
        let boxes_touch = match (self.bounds(), other.bounds()) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        };
        if !boxes_touch {
            return false;
        }
        self.edges()
            .any(|(a, b)| other.edges().any(|(c, d)| segments_intersect(a, b, c, d)))
            || other.exterior.first().is_some_and(|p| self.contains_point(p))
            || self.exterior.first().is_some_and(|p| other.contains_point(p))
    }

    /// True when any part of `line` lies inside or on the ring.
    #[must_use]
    pub fn intersects_line(&self, line: &LineString) -> bool {
        let boxes_touch = match (self.bounds(), line.bounds()) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        };
        if !boxes_touch {
            return false;
        }
        let points = line.points();
        points.first().is_some_and(|p| self.contains_point(p))
            || points.windows(2).any(|w| {
                self.edges()
                    .any(|(a, b)| segments_intersect(w[0], w[1], a, b))
            })
    }

    /// Shortest distance between the two rings, 0 when they intersect.
    ///
    /// Infinite when either ring is empty.
    #[must_use]
    pub fn distance_to(&self, other: &Polygon) -> f64 {
        if self.exterior.is_empty() || other.exterior.is_empty() {
            return f64::INFINITY;
        }
        if self.intersects(other) {
            return 0.0;
        }
        let one_way = |ring: &Polygon, from: &Polygon| {
            from.exterior
                .iter()
                .flat_map(|p| ring.edges().map(move |(a, b)| point_segment_distance(*p, a, b)))
                .fold(f64::INFINITY, f64::min)
        };
        one_way(self, other).min(one_way(other, self))
    }

    /// True when no two non-adjacent edges touch.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        let n = self.exterior.len();
        if n < 4 {
            return true;
        }
        let edges: Vec<(Point, Point)> = self.edges().collect();
        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if adjacent {
                    continue;
                }
                if segments_intersect(edges[i].0, edges[i].1, edges[j].0, edges[j].1) {
                    return false;
                }
            }
        }
        true
    }

    /// Validate and repair the ring.
    ///
    /// Repair steps: drop non-finite vertices, drop consecutive duplicates and
    /// the closing duplicate, and replace a self-intersecting ring by its
    /// convex hull. The result is rejected if fewer than three distinct
    /// vertices remain or it encloses no area.
    pub fn repaired(&self) -> PlumeResult<Polygon> {
        let mut ring: Vec<Point> = Vec::with_capacity(self.exterior.len());
        for p in self.exterior.iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
            if ring.last() != Some(p) {
                ring.push(*p);
            }
        }
        while ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(PlumeError::invalid_polygon(format!(
                "{} distinct vertices after cleanup, need at least 3",
                ring.len()
            )));
        }

        let mut polygon = Polygon::new(ring);
        if !polygon.is_simple() {
            tracing::debug!(
                "Site polygon self-intersects, replacing with convex hull of {} vertices",
                polygon.exterior.len()
            );
            polygon = polygon.convex_hull();
        }

        if polygon.exterior.len() < 3 || polygon.area() < MIN_AREA {
            return Err(PlumeError::invalid_polygon("ring encloses no area"));
        }
        Ok(polygon)
    }

    /// Counter-clockwise convex hull (Andrew's monotone chain).
    #[must_use]
    pub fn convex_hull(&self) -> Polygon {
        let mut pts = self.exterior.clone();
        pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        pts.dedup();
        if pts.len() < 3 {
            return Polygon::new(pts);
        }

        let mut lower: Vec<Point> = Vec::with_capacity(pts.len());
        for p in &pts {
            while lower.len() >= 2
                && cross(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0.0
            {
                lower.pop();
            }
            lower.push(*p);
        }
        let mut upper: Vec<Point> = Vec::with_capacity(pts.len());
        for p in pts.iter().rev() {
            while upper.len() >= 2
                && cross(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0.0
            {
                upper.pop();
            }
            upper.push(*p);
        }
        lower.pop();
        upper.pop();
        lower.extend(upper);
        Polygon::new(lower)
    }

    /// Clip against an axis-aligned box (Sutherland–Hodgman).
    ///
    /// The window is convex, so the clipped area is exact for concave subjects too.
    #[must_use]
    pub fn clip_to_bounds(&self, bounds: &Bounds) -> Polygon {
        let mut ring = self.exterior.clone();
        for edge in [Edge::MinX, Edge::MaxX, Edge::MinY, Edge::MaxY] {
            if ring.is_empty() {
                break;
            }
            let input = std::mem::take(&mut ring);
            let n = input.len();
            for i in 0..n {
                let current = input[i];
                let previous = input[(i + n - 1) % n];
                let cur_in = edge.inside(&current, bounds);
                let prev_in = edge.inside(&previous, bounds);
                if cur_in {
                    if !prev_in {
                        ring.push(edge.intersect(previous, current, bounds));
                    }
                    ring.push(current);
                } else if prev_in {
                    ring.push(edge.intersect(previous, current, bounds));
                }
            }
        }
        Polygon::new(ring)
    }

    /// Project every vertex from lon/lat degrees to UTM metres.
    #[must_use]
    pub fn project(&self, projection: &UtmProjection) -> Polygon {
        Polygon::new(
            self.exterior
                .iter()
                .map(|p| projection.forward(p.x, p.y))
                .collect(),
        )
    }

    /// Exact bit pattern of the ring, used as a memoisation key.
    #[must_use]
    pub fn key_bits(&self) -> Vec<u64> {
        self.exterior
            .iter()
            .flat_map(|p| [p.x.to_bits(), p.y.to_bits()])
            .collect()
    }
}

#[derive(Clone, Copy)]
enum Edge {
    MinX,
    MaxX,
    MinY,
    MaxY,
}

impl Edge {
    fn inside(self, p: &Point, bounds: &Bounds) -> bool {
        match self {
            Edge::MinX => p.x >= bounds.min_x,
            Edge::MaxX => p.x <= bounds.max_x,
            Edge::MinY => p.y >= bounds.min_y,
            Edge::MaxY => p.y <= bounds.max_y,
        }
    }

    fn intersect(self, a: Point, b: Point, bounds: &Bounds) -> Point {
        match self {
            Edge::MinX | Edge::MaxX => {
                let x = if matches!(self, Edge::MinX) {
                    bounds.min_x
                } else {
                    bounds.max_x
                };
                let t = (x - a.x) / (b.x - a.x);
                Point::new(x, a.y + t * (b.y - a.y))
            }
            Edge::MinY | Edge::MaxY => {
                let y = if matches!(self, Edge::MinY) {
                    bounds.min_y
                } else {
                    bounds.max_y
                };
                let t = (y - a.y) / (b.y - a.y);
                Point::new(a.x + t * (b.x - a.x), y)
            }
        }
    }
}

/// z-component of (b − a) × (c − a).
#[inline]
fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    let t = if len2 > 0.0 {
        ((p - a).dot(&ab) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    nalgebra::distance(&p, &(a + ab * t))
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}
