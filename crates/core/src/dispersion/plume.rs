//! Single-source Gaussian plume over a receptor grid.
//!
//! Ground-level concentration from a continuous point release:
//!
//! ```text
//! C = Q / (π · u · σy · σz) · exp(−yc² / (2σy²)) · exp(−H² / (2σz²))
//! ```
//!
//! where `yc` is the crosswind offset and `H` the release height. The
//! ground-reflection image term is intentionally omitted, so this is the
//! plain (non-reflected) form rather than the textbook 2× reflected one.
//!
//! Spread always uses a single fixed stability class (slightly unstable by
//! default) instead of one inferred from wind, cloud and time of day. This is
//! an approximation carried over from the calibrated reference model; change
//! the class through [`PlumeConfig`] rather than here.

use super::stability::{StabilityClass, StabilityModel};
use crate::core_types::Wind;
use crate::geometry::{Point, Vector};
use crate::receptors::ReceptorGrid;
use nalgebra::Rotation2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Plume evaluation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlumeConfig {
    /// Stability class used for every receptor (1-6; others → neutral)
    pub stability_class: u8,
    /// Lower bound applied to both σy and σz (m)
    pub sigma_floor: f64,
    /// Lower bound applied to wind speed inside the evaluator (m/s)
    pub min_wind_speed: f64,
}

impl Default for PlumeConfig {
    fn default() -> Self {
        Self {
            stability_class: StabilityClass::SlightlyUnstable.index(),
            sigma_floor: 1e-3,
            min_wind_speed: 1e-3,
        }
    }
}

/// Receptor position relative to a source in plume axes (m).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumeCoordinates {
    /// Distance along the wind; ≤ 0 means upwind of the source
    pub downwind: f64,
    /// Signed distance across the wind
    pub crosswind: f64,
}

/// Rotates receptor offsets into plume axes for a given wind.
#[derive(Debug, Clone, Copy)]
pub struct PlumeFrame {
    rotation: Rotation2<f64>,
}

impl PlumeFrame {
    /// Frame whose +x axis points downwind.
    #[must_use]
    pub fn new(wind: &Wind) -> Self {
        // Rotating by −φ maps the travel direction onto +x:
        // downwind = rx·cos φ + ry·sin φ, crosswind = −rx·sin φ + ry·cos φ
        Self {
            rotation: Rotation2::new(-wind.travel_angle()),
        }
    }

    /// Express `receptor − source` in plume axes.
    #[inline]
    #[must_use]
    pub fn locate(&self, source: &Point, receptor: &Point) -> PlumeCoordinates {
        let offset: Vector = receptor - source;
        let rotated = self.rotation * offset;
        PlumeCoordinates {
            downwind: rotated.x,
            crosswind: rotated.y,
        }
    }
}

/// Evaluates unit-emission plumes using an injected stability model.
#[derive(Debug, Clone, Copy)]
pub struct PlumeEvaluator<'a> {
    stability: &'a StabilityModel,
    class: StabilityClass,
    config: PlumeConfig,
}

impl<'a> PlumeEvaluator<'a> {
    /// Evaluator with the given settings.
    #[must_use]
    pub fn new(stability: &'a StabilityModel, config: PlumeConfig) -> Self {
        Self {
            stability,
            class: StabilityClass::from_index_or_neutral(config.stability_class),
            config,
        }
    }

    /// Stability class applied to every receptor.
    #[must_use]
    pub fn class(&self) -> StabilityClass {
        self.class
    }

    /// Concentration at one receptor given its plume coordinates.
    ///
    /// Exactly zero for receptors at or behind the source; the spread model
    /// is not consulted for them.
    #[inline]
    #[must_use]
    pub fn concentration_at(
        &self,
        emission_rate: f64,
        release_height: f64,
        wind_speed: f64,
        at: PlumeCoordinates,
    ) -> f64 {
        if at.downwind.is_nan() || at.downwind <= 0.0 {
            return 0.0;
        }

        let sigmas = self.stability.sigmas(self.class, at.downwind);
        let sig_y = sigmas.y.max(self.config.sigma_floor);
        let sig_z = sigmas.z.max(self.config.sigma_floor);
        let u = wind_speed.max(self.config.min_wind_speed);

        let central = emission_rate / (PI * u * sig_y * sig_z);
        let lateral = (-at.crosswind * at.crosswind / (2.0 * sig_y * sig_y)).exp();
        let vertical = (-release_height * release_height / (2.0 * sig_z * sig_z)).exp();

        let c = central * lateral * vertical;
        if c.is_finite() {
            c
        } else {
            0.0
        }
    }

    /// Unit-rate plume from `source` over every receptor, in parallel.
    ///
    /// Output is aligned with `receptors`.
    #[must_use]
    pub fn evaluate(
        &self,
        emission_rate: f64,
        source: &Point,
        release_height: f64,
        wind: &Wind,
        receptors: &ReceptorGrid,
    ) -> Vec<f64> {
        let frame = PlumeFrame::new(wind);
        receptors
            .points()
            .par_iter()
            .map(|r| {
                self.concentration_at(
                    emission_rate,
                    release_height,
                    wind.speed,
                    frame.locate(source, r),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receptors::DEFAULT_MAX_RECEPTORS;
    use approx::assert_relative_eq;

    fn downwind_point(wind: &Wind, distance: f64) -> Point {
        let (dx, dy) = wind.downwind_unit();
        Point::new(distance * dx, distance * dy)
    }

    #[test]
    fn frame_aligns_with_travel_direction() {
        let wind = Wind::new(3.0, 240.0);
        let frame = PlumeFrame::new(&wind);
        let at = frame.locate(&Point::origin(), &downwind_point(&wind, 500.0));
        assert_relative_eq!(at.downwind, 500.0, epsilon = 1e-9);
        assert_relative_eq!(at.crosswind, 0.0, epsilon = 1e-9);

        // 90° to the left of travel is +crosswind
        let (dx, dy) = wind.downwind_unit();
        let left = frame.locate(&Point::origin(), &Point::new(-dy * 40.0, dx * 40.0));
        assert_relative_eq!(left.downwind, 0.0, epsilon = 1e-9);
        assert_relative_eq!(left.crosswind, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn upwind_and_colocated_receptors_are_zero() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let wind = Wind::new(3.2, 240.0);
        let grid = ReceptorGrid::from_points(vec![
            downwind_point(&wind, -500.0),
            Point::origin(),
            downwind_point(&wind, -1.0),
        ]);
        let c = plume.evaluate(1.0, &Point::origin(), 1.5, &wind, &grid);
        assert_eq!(c, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn matches_closed_form_on_centreline() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let wind = Wind::new(2.0, 270.0);
        let h = 30.0;
        let grid = ReceptorGrid::from_points(vec![Point::new(500.0, 0.0)]);
        let c = plume.evaluate(2.5, &Point::origin(), h, &wind, &grid)[0];

        let s = model.sigmas(StabilityClass::SlightlyUnstable, 500.0);
        let expected =
            2.5 / (PI * 2.0 * s.y * s.z) * (-h * h / (2.0 * s.z * s.z)).exp();
        assert_relative_eq!(c, expected, max_relative = 1e-12);
    }

    #[test]
    fn doubling_wind_halves_concentration() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let slow = Wind::new(2.0, 200.0);
        let fast = slow.with_speed(4.0);
        let grid = ReceptorGrid::from_points(vec![
            downwind_point(&slow, 150.0),
            downwind_point(&slow, 900.0),
        ]);
        let c_slow = plume.evaluate(1.0, &Point::origin(), 1.5, &slow, &grid);
        let c_fast = plume.evaluate(1.0, &Point::origin(), 1.5, &fast, &grid);
        for (s, f) in c_slow.iter().zip(&c_fast) {
            assert!(*s > 0.0);
            assert_relative_eq!(*f, s / 2.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn concentration_falls_off_crosswind() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let centre = PlumeCoordinates {
            downwind: 400.0,
            crosswind: 0.0,
        };
        let off = PlumeCoordinates {
            downwind: 400.0,
            crosswind: 60.0,
        };
        assert!(
            plume.concentration_at(1.0, 1.5, 3.0, centre)
                > plume.concentration_at(1.0, 1.5, 3.0, off)
        );
    }

    #[test]
    fn zero_wind_stays_finite() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let at = PlumeCoordinates {
            downwind: 1e-9,
            crosswind: 0.0,
        };
        let c = plume.concentration_at(1.0, 0.0, 0.0, at);
        assert!(c.is_finite());
        assert!(c >= 0.0);
    }

    #[test]
    fn parallel_matches_per_receptor() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let wind = Wind::new(3.2, 240.0);
        let grid = ReceptorGrid::over_bounds(
            &crate::geometry::Bounds {
                min_x: -500.0,
                min_y: -500.0,
                max_x: 500.0,
                max_y: 500.0,
            },
            50.0,
            DEFAULT_MAX_RECEPTORS,
        )
        .unwrap();
        let par = plume.evaluate(1.0, &Point::origin(), 8.0, &wind, &grid);
        let frame = PlumeFrame::new(&wind);
        let seq: Vec<f64> = grid
            .points()
            .iter()
            .map(|r| plume.concentration_at(1.0, 8.0, wind.speed, frame.locate(&Point::origin(), r)))
            .collect();
        assert_eq!(par, seq);
    }

    #[test]
    fn default_class_is_slightly_unstable() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        assert_eq!(plume.class(), StabilityClass::SlightlyUnstable);

        let odd = PlumeConfig {
            stability_class: 0,
            ..PlumeConfig::default()
        };
        assert_eq!(
            PlumeEvaluator::new(&model, odd).class(),
            StabilityClass::Neutral
        );
    }
}
