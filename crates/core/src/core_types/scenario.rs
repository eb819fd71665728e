//! Scenario parameters and background levels.

use super::pollutant::{gas_rates, rate_of, GasRates, Pollutant};
use serde::{Deserialize, Serialize};

/// Land-use and demographic knobs for one scenario.
///
/// `built` and `green` are surface fractions in `[0, 1]`. They are not
/// required to sum to any fixed total; keeping built + green balanced
/// between scenarios is the job of whoever generates the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    /// Built-up surface fraction
    pub built: f64,
    /// Vegetated surface fraction
    pub green: f64,
    /// Annual population growth rate (0.015 = 1.5 %/yr)
    pub pop_growth: f64,
    /// Projection horizon (years)
    pub years: f64,
}

impl ScenarioParameters {
    /// Create a parameter set.
    #[must_use]
    pub const fn new(built: f64, green: f64, pop_growth: f64, years: f64) -> Self {
        Self {
            built,
            green,
            pop_growth,
            years,
        }
    }

    /// Present-day parameters: no growth, zero horizon.
    #[must_use]
    pub const fn current(built: f64, green: f64) -> Self {
        Self::new(built, green, 0.0, 0.0)
    }

    /// Built fraction clamped to `[0, 1]` (NaN → 0).
    #[must_use]
    pub fn built_fraction(&self) -> f64 {
        clamp_fraction(self.built)
    }

    /// Green fraction clamped to `[0, 1]` (NaN → 0).
    #[must_use]
    pub fn green_fraction(&self) -> f64 {
        clamp_fraction(self.green)
    }

    /// Compound population multiplier `(1 + growth)^years`.
    ///
    /// Non-finite results (e.g. growth below −100 %) collapse to zero.
    #[must_use]
    pub fn population_multiplier(&self) -> f64 {
        let m = (1.0 + self.pop_growth).powf(self.years);
        if m.is_finite() {
            m.max(0.0)
        } else {
            0.0
        }
    }
}

fn clamp_fraction(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Ambient concentrations independent of locally modelled sources (µg/m³).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GasRates", into = "GasRates")]
pub struct BackgroundLevels {
    levels: GasRates,
}

impl BackgroundLevels {
    /// Wrap a per-gas map; negative and non-finite entries are clamped to 0.
    #[must_use]
    pub fn new(levels: GasRates) -> Self {
        Self {
            levels: levels
                .into_iter()
                .map(|(gas, v)| (gas, if v.is_finite() { v.max(0.0) } else { 0.0 }))
                .collect(),
        }
    }

    /// Fallback used when no live measurement is available.
    ///
    /// Typical winter readings for a dense Indian city centre.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(gas_rates([
            (Pollutant::Pm25, 65.0),
            (Pollutant::Pm10, 80.0),
            (Pollutant::Co, 300.0),
            (Pollutant::No2, 10.0),
            (Pollutant::So2, 5.0),
            (Pollutant::No, 5.0),
            (Pollutant::Nh3, 2.0),
            (Pollutant::O3, 40.0),
        ]))
    }

    /// Level for `gas`, zero when unlisted.
    #[must_use]
    pub fn level(&self, gas: Pollutant) -> f64 {
        rate_of(&self.levels, gas)
    }

    /// Underlying map.
    #[must_use]
    pub fn as_rates(&self) -> &GasRates {
        &self.levels
    }
}

impl From<GasRates> for BackgroundLevels {
    fn from(levels: GasRates) -> Self {
        Self::new(levels)
    }
}

impl From<BackgroundLevels> for GasRates {
    fn from(background: BackgroundLevels) -> Self {
        background.levels
    }
}

impl Default for BackgroundLevels {
    fn default() -> Self {
        Self::fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fractions_are_clamped() {
        let p = ScenarioParameters::new(1.4, -0.2, 0.0, 0.0);
        assert_eq!(p.built_fraction(), 1.0);
        assert_eq!(p.green_fraction(), 0.0);
        assert_eq!(ScenarioParameters::new(f64::NAN, 0.3, 0.0, 0.0).built_fraction(), 0.0);
    }

    #[test]
    fn population_compounds() {
        let p = ScenarioParameters::new(0.4, 0.2, 0.015, 15.0);
        assert_relative_eq!(p.population_multiplier(), 1.015_f64.powi(15), epsilon = 1e-12);
        assert_eq!(ScenarioParameters::current(0.4, 0.2).population_multiplier(), 1.0);
        assert_eq!(
            ScenarioParameters::new(0.0, 0.0, -2.0, 0.5).population_multiplier(),
            0.0
        );
    }

    #[test]
    fn background_clamps_and_defaults() {
        let bg = BackgroundLevels::new(gas_rates([
            (Pollutant::Pm25, -3.0),
            (Pollutant::Co, f64::NAN),
            (Pollutant::O3, 41.0),
        ]));
        assert_eq!(bg.level(Pollutant::Pm25), 0.0);
        assert_eq!(bg.level(Pollutant::Co), 0.0);
        assert_eq!(bg.level(Pollutant::O3), 41.0);
        assert_eq!(bg.level(Pollutant::Nh3), 0.0);
        assert_eq!(BackgroundLevels::default().level(Pollutant::Co), 300.0);
    }

    #[test]
    fn background_deserializes_with_clamping() {
        let bg: BackgroundLevels = serde_json::from_str(r#"{"pm10": -1.0, "no2": 12.5}"#).unwrap();
        assert_eq!(bg.level(Pollutant::Pm10), 0.0);
        assert_eq!(bg.level(Pollutant::No2), 12.5);
    }
}
