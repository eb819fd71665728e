//! Static wind vector for a dispersion run.

use serde::{Deserialize, Serialize};

/// Single static wind for a whole run.
///
/// Direction follows the meteorological convention: the bearing the wind
/// blows *from*, in degrees clockwise from north. A 240° wind comes from the
/// west-south-west and carries plumes towards the east-north-east.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Wind speed at reference height (m/s)
    pub speed: f64,

    /// Direction the wind blows from (degrees)
    #[serde(rename = "dir")]
    pub direction_deg: f64,
}

impl Wind {
    /// Create a wind vector.
    ///
    /// Degenerate speeds are accepted here; the plume evaluator and the
    /// roughness adjustment floor them before any division.
    #[must_use]
    pub const fn new(speed: f64, direction_deg: f64) -> Self {
        Self {
            speed,
            direction_deg,
        }
    }

    /// Plume travel angle in radians, counter-clockwise from the +x (east) axis.
    ///
    /// `phi = 270° − direction`, i.e. the downwind heading in maths convention.
    #[inline]
    #[must_use]
    pub fn travel_angle(&self) -> f64 {
        (270.0 - self.direction_deg).to_radians()
    }

    /// Unit vector pointing downwind in projected (x = east, y = north) space.
    #[must_use]
    pub fn downwind_unit(&self) -> (f64, f64) {
        let phi = self.travel_angle();
        (phi.cos(), phi.sin())
    }

    /// Same direction, different speed.
    #[must_use]
    pub fn with_speed(self, speed: f64) -> Self {
        Self { speed, ..self }
    }
}

impl Default for Wind {
    /// Prevailing afternoon wind used by the reference runs.
    fn default() -> Self {
        Self::new(3.2, 240.0)
    }
}
