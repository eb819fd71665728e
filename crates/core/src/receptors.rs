//! Ground-level receptor grid.

use crate::error::{PlumeError, PlumeResult};
use crate::geometry::{Bounds, Point};
use serde::{Deserialize, Serialize};

/// Smallest spacing the grid builder will honour (m).
pub const MIN_RECEPTOR_SPACING: f64 = 1.0;

/// Default ceiling on receptors per grid (a 500 km square at 250 m).
pub const DEFAULT_MAX_RECEPTORS: usize = 4_000_000;

/// Ordered set of ground receptors.
///
/// Grids built over a bounding box are ordered with x as the outer loop and
/// y as the inner loop: `(x0, y0), (x0, y1), …, (x1, y0), …`. Both axes are
/// half-open, `min ≤ coordinate < max`, so a box narrower than the spacing
/// still gets one column/row at its minimum edge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReceptorGrid {
    points: Vec<Point>,
    spacing: Option<f64>,
}

impl ReceptorGrid {
    /// Regular grid over `bounds` at `spacing` metres.
    ///
    /// Spacing is floored at [`MIN_RECEPTOR_SPACING`]; non-finite bounds
    /// produce an empty grid. Fails before allocating when the grid would
    /// hold more than `max_receptors` points.
    pub fn over_bounds(bounds: &Bounds, spacing: f64, max_receptors: usize) -> PlumeResult<Self> {
        let spacing = if spacing.is_finite() {
            spacing.max(MIN_RECEPTOR_SPACING)
        } else {
            MIN_RECEPTOR_SPACING
        };
        let nx = axis_count(bounds.min_x, bounds.max_x, spacing);
        let ny = axis_count(bounds.min_y, bounds.max_y, spacing);
        let count = nx
            .checked_mul(ny)
            .filter(|&c| c <= max_receptors)
            .ok_or_else(|| {
                PlumeError::invalid_polygon(format!(
                    "site spans {:.0} x {:.0} m, more than {max_receptors} receptors at {spacing} m spacing",
                    bounds.width(),
                    bounds.height()
                ))
            })?;

        let mut points = Vec::with_capacity(count);
        for i in 0..nx {
            let x = bounds.min_x + i as f64 * spacing;
            for j in 0..ny {
                points.push(Point::new(x, bounds.min_y + j as f64 * spacing));
            }
        }

        Ok(Self {
            points,
            spacing: Some(spacing),
        })
    }

    /// Grid from explicit receptor locations, kept in the given order.
    #[must_use]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            points,
            spacing: None,
        }
    }

    /// Receptor locations in grid order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of receptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True for a grid with no receptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Spacing used to build the grid, `None` for explicit point sets.
    #[must_use]
    pub fn spacing(&self) -> Option<f64> {
        self.spacing
    }
}

/// Number of samples `min, min + s, …` strictly below `max`.
fn axis_count(min: f64, max: f64, spacing: f64) -> usize {
    let span = max - min;
    if !span.is_finite() || span <= 0.0 {
        return 0;
    }
    // Saturates for huge spans; the caller's receptor cap rejects those.
    (span / spacing).ceil() as usize
}
