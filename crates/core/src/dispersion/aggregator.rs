//! Multi-source superposition with urban roughness.

use super::plume::{PlumeEvaluator, PlumeFrame};
use crate::core_types::{gas_union, rate_of, ConcentrationField, EmissionSource, Pollutant, Wind};
use crate::receptors::ReceptorGrid;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Receptors handled per parallel task.
const RECEPTOR_BLOCK: usize = 256;

/// Logarithmic wind-profile settings for the built-fraction roughness adjustment.
///
/// ```text
/// z0     = base_z0 + built · built_z0_gain
/// factor = ln(h_ref / z0) / ln(h_ref / base_z0)
/// u_eff  = max(u · factor, min_effective_speed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoughnessConfig {
    /// Roughness length of open terrain (m)
    pub base_z0: f64,
    /// Additional roughness length per unit built fraction (m)
    pub built_z0_gain: f64,
    /// Height of the wind measurement (m)
    pub reference_height: f64,
    /// Floor on the adjusted speed (m/s)
    pub min_effective_speed: f64,
}

impl Default for RoughnessConfig {
    fn default() -> Self {
        Self {
            base_z0: 0.1,
            built_z0_gain: 1.5,
            reference_height: 10.0,
            min_effective_speed: 0.5,
        }
    }
}

impl RoughnessConfig {
    /// Surface roughness length for a built fraction (m).
    #[must_use]
    pub fn roughness_length(&self, built_fraction: f64) -> f64 {
        self.base_z0 + built_fraction * self.built_z0_gain
    }

    /// Wind-speed reduction factor relative to open terrain.
    ///
    /// 1 for open terrain; ≤ 0 or non-finite when z0 reaches the reference
    /// height, which the speed floor then absorbs.
    #[must_use]
    pub fn speed_factor(&self, built_fraction: f64) -> f64 {
        let z0 = self.roughness_length(built_fraction);
        (self.reference_height / z0).ln() / (self.reference_height / self.base_z0).ln()
    }

    /// Wind slowed by surface roughness, never below the configured floor.
    ///
    /// A non-finite input speed (NaN or ±∞) is treated as calm and takes the
    /// floor.
    #[must_use]
    pub fn effective_wind(&self, wind: &Wind, built_fraction: f64) -> Wind {
        if !wind.speed.is_finite() {
            warn!(
                "Non-finite wind speed {}, using floor {} m/s",
                wind.speed, self.min_effective_speed
            );
            return wind.with_speed(self.min_effective_speed);
        }
        let scaled = wind.speed * self.speed_factor(built_fraction);
        let speed = if scaled.is_finite() {
            scaled.max(self.min_effective_speed)
        } else {
            self.min_effective_speed
        };
        wind.with_speed(speed)
    }
}

/// Sums scaled unit plumes from every source.
///
/// The gas vocabulary of the output is the union over all sources; a source
/// that does not list a gas contributes exactly zero to it.
#[derive(Debug, Clone, Copy)]
pub struct DispersionAggregator<'a> {
    plume: PlumeEvaluator<'a>,
    roughness: RoughnessConfig,
}

impl<'a> DispersionAggregator<'a> {
    /// Aggregator over a plume evaluator and roughness profile.
    #[must_use]
    pub fn new(plume: PlumeEvaluator<'a>, roughness: RoughnessConfig) -> Self {
        Self { plume, roughness }
    }

    /// Roughness profile in use.
    #[must_use]
    pub fn roughness(&self) -> &RoughnessConfig {
        &self.roughness
    }

    /// Superpose all sources using `wind` exactly as given.
    ///
    /// Receptors are split into fixed-size blocks processed in parallel. Each
    /// receptor sums its sources sequentially in source order, so the result
    /// does not depend on thread scheduling, and working memory is one field
    /// plus a scratch copy of it whatever the number of sources.
    #[must_use]
    pub fn aggregate(
        &self,
        sources: &[EmissionSource],
        receptors: &ReceptorGrid,
        wind: &Wind,
    ) -> ConcentrationField {
        let n = receptors.len();
        let gases: BTreeSet<Pollutant> = gas_union(sources.iter().map(|s| &s.rates));
        if sources.is_empty() || gases.is_empty() {
            return ConcentrationField::empty(n);
        }

        let gases: Vec<Pollutant> = gases.into_iter().collect();
        let active: Vec<(&EmissionSource, Vec<f64>)> = sources
            .iter()
            .filter(|s| s.rates.values().any(|&q| q != 0.0))
            .map(|s| (s, gases.iter().map(|&gas| rate_of(&s.rates, gas)).collect()))
            .collect();

        // Receptor-major scratch: `gases.len()` values per receptor.
        let g = gases.len();
        let frame = PlumeFrame::new(wind);
        let mut interleaved = vec![0.0; n * g];
        interleaved
            .par_chunks_mut(RECEPTOR_BLOCK * g)
            .zip(receptors.points().par_chunks(RECEPTOR_BLOCK))
            .for_each(|(out, block)| {
                for (source, rates) in &active {
                    for (receptor, cell) in block.iter().zip(out.chunks_exact_mut(g)) {
                        let c = self.plume.concentration_at(
                            1.0,
                            source.height,
                            wind.speed,
                            frame.locate(&source.position, receptor),
                        );
                        if c == 0.0 {
                            continue;
                        }
                        for (dst, &q) in cell.iter_mut().zip(rates) {
                            if q != 0.0 {
                                *dst += c * q;
                            }
                        }
                    }
                }
            });

        ConcentrationField::from_interleaved(n, &gases, &interleaved)
    }

    /// Superpose all sources under the roughness-adjusted wind for `built_fraction`.
    #[must_use]
    pub fn run(
        &self,
        sources: &[EmissionSource],
        receptors: &ReceptorGrid,
        wind: &Wind,
        built_fraction: f64,
    ) -> ConcentrationField {
        let effective = self.roughness.effective_wind(wind, built_fraction);
        debug!(
            "Dispersion: {} sources x {} receptors, wind {:.2} -> {:.2} m/s (built={:.2})",
            sources.len(),
            receptors.len(),
            wind.speed,
            effective.speed,
            built_fraction
        );
        self.aggregate(sources, receptors, &effective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receptors::DEFAULT_MAX_RECEPTORS;
    use crate::core_types::{gas_rates, SourceKind};
    use crate::dispersion::{PlumeConfig, StabilityModel};
    use crate::geometry::Point;
    use approx::assert_relative_eq;

    fn receptors_downwind(wind: &Wind) -> ReceptorGrid {
        let (dx, dy) = wind.downwind_unit();
        ReceptorGrid::from_points(
            [100.0, 300.0, 700.0, -300.0]
                .iter()
                .map(|d| Point::new(d * dx + 5.0, d * dy - 5.0))
                .collect(),
        )
    }

    #[test]
    fn roughness_factor_matches_log_profile() {
        let r = RoughnessConfig::default();
        assert_relative_eq!(r.speed_factor(0.0), 1.0);
        let expected = (10.0_f64 / 0.7).ln() / (10.0_f64 / 0.1).ln();
        assert_relative_eq!(r.speed_factor(0.4), expected, max_relative = 1e-12);

        let w = r.effective_wind(&Wind::new(3.2, 240.0), 0.4);
        assert_relative_eq!(w.speed, 3.2 * expected, max_relative = 1e-12);
        assert_eq!(w.direction_deg, 240.0);
    }

    #[test]
    fn effective_wind_is_floored() {
        let r = RoughnessConfig::default();
        assert_eq!(r.effective_wind(&Wind::new(0.0, 90.0), 0.0).speed, 0.5);
        assert_eq!(r.effective_wind(&Wind::new(0.2, 90.0), 1.0).speed, 0.5);
    }

    #[test]
    fn non_finite_wind_takes_the_floor() {
        let r = RoughnessConfig::default();
        for speed in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let w = r.effective_wind(&Wind::new(speed, 90.0), 0.3);
            assert_eq!(w.speed, 0.5, "{speed}");
            assert_eq!(w.direction_deg, 90.0);
        }
    }

    #[test]
    fn many_sources_over_many_blocks_match_sequential_sum() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let agg = DispersionAggregator::new(plume, RoughnessConfig::default());
        let wind = Wind::new(2.5, 200.0);
        let grid = ReceptorGrid::over_bounds(
            &crate::geometry::Bounds {
                min_x: -1_000.0,
                min_y: -1_000.0,
                max_x: 1_000.0,
                max_y: 1_000.0,
            },
            50.0,
            DEFAULT_MAX_RECEPTORS,
        )
        .unwrap();
        assert!(grid.len() > 4 * RECEPTOR_BLOCK);

        let sources: Vec<EmissionSource> = (0..40)
            .map(|i| {
                let t = f64::from(i);
                EmissionSource::new(
                    SourceKind::Road,
                    Point::new(-800.0 + 40.0 * t, 300.0 - 15.0 * t),
                    gas_rates([(Pollutant::Co, 0.1 + 0.01 * t), (Pollutant::No2, 0.002 * t)]),
                    1.5,
                )
            })
            .collect();
        let field = agg.aggregate(&sources, &grid, &wind);

        let mut co = vec![0.0; grid.len()];
        let mut no2 = vec![0.0; grid.len()];
        for s in &sources {
            let unit = plume.evaluate(1.0, &s.position, s.height, &wind, &grid);
            for i in 0..grid.len() {
                if unit[i] != 0.0 {
                    co[i] += unit[i] * s.rate(Pollutant::Co);
                    if s.rate(Pollutant::No2) != 0.0 {
                        no2[i] += unit[i] * s.rate(Pollutant::No2);
                    }
                }
            }
        }
        assert_eq!(field.get(Pollutant::Co).unwrap(), co.as_slice());
        assert_eq!(field.get(Pollutant::No2).unwrap(), no2.as_slice());
        assert!(co.iter().any(|&v| v > 0.0));

        // Same answer on every run.
        assert_eq!(agg.aggregate(&sources, &grid, &wind), field);
    }

    #[test]
    fn superposition_is_linear_in_rates() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let agg = DispersionAggregator::new(plume, RoughnessConfig::default());
        let wind = Wind::new(3.0, 250.0);
        let grid = receptors_downwind(&wind);

        let src = |q: f64| {
            EmissionSource::new(
                SourceKind::Road,
                Point::new(5.0, -5.0),
                gas_rates([(Pollutant::Pm25, q)]),
                1.5,
            )
        };
        let single = agg.aggregate(&[src(1.0)], &grid, &wind);
        let doubled = agg.aggregate(&[src(1.0), src(1.0)], &grid, &wind);
        let unit = plume.evaluate(1.0, &Point::new(5.0, -5.0), 1.5, &wind, &grid);

        let s = single.get(Pollutant::Pm25).unwrap();
        let d = doubled.get(Pollutant::Pm25).unwrap();
        for i in 0..grid.len() {
            assert_relative_eq!(s[i], unit[i], max_relative = 1e-12);
            assert_relative_eq!(d[i], 2.0 * unit[i], max_relative = 1e-12);
        }
        assert_eq!(s[3], 0.0, "upwind receptor must stay clean");
    }

    #[test]
    fn absent_gas_contributes_nothing() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let agg = DispersionAggregator::new(plume, RoughnessConfig::default());
        let wind = Wind::new(3.0, 250.0);
        let grid = receptors_downwind(&wind);

        let road = EmissionSource::new(
            SourceKind::Road,
            Point::new(5.0, -5.0),
            gas_rates([(Pollutant::Pm25, 0.5)]),
            1.5,
        );
        let stack = EmissionSource::new(
            SourceKind::Industry,
            Point::new(5.0, -5.0),
            gas_rates([(Pollutant::So2, 2.0)]),
            30.0,
        );

        // Road first: the union still picks up SO2 from the stack.
        let field = agg.aggregate(&[road.clone(), stack.clone()], &grid, &wind);
        assert_eq!(
            field.gases().collect::<Vec<_>>(),
            vec![Pollutant::Pm25, Pollutant::So2]
        );

        let road_only = agg.aggregate(&[road], &grid, &wind);
        let stack_only = agg.aggregate(&[stack], &grid, &wind);
        assert_eq!(
            field.get(Pollutant::Pm25).unwrap(),
            road_only.get(Pollutant::Pm25).unwrap()
        );
        assert_eq!(
            field.get(Pollutant::So2).unwrap(),
            stack_only.get(Pollutant::So2).unwrap()
        );
    }

    #[test]
    fn no_sources_yields_empty_field() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let agg = DispersionAggregator::new(plume, RoughnessConfig::default());
        let wind = Wind::default();
        let grid = receptors_downwind(&wind);
        let field = agg.run(&[], &grid, &wind, 0.3);
        assert!(field.is_empty());
        assert_eq!(field.receptor_count(), grid.len());
    }

    #[test]
    fn rougher_surface_raises_concentration() {
        let model = StabilityModel::default();
        let plume = PlumeEvaluator::new(&model, PlumeConfig::default());
        let agg = DispersionAggregator::new(plume, RoughnessConfig::default());
        let wind = Wind::new(4.0, 250.0);
        let grid = receptors_downwind(&wind);
        let src = [EmissionSource::new(
            SourceKind::Road,
            Point::new(5.0, -5.0),
            gas_rates([(Pollutant::Co, 1.0)]),
            1.5,
        )];
        let open = agg.run(&src, &grid, &wind, 0.0);
        let dense = agg.run(&src, &grid, &wind, 0.8);
        assert!(
            dense.get(Pollutant::Co).unwrap()[0] > open.get(Pollutant::Co).unwrap()[0]
        );
    }
}
