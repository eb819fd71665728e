//! Empirical near-surface corrections for built-up and vegetated land.

use crate::core_types::{gas_rates, ConcentrationField, GasRates, Pollutant};
use serde::{Deserialize, Serialize};

/// Street-canyon trapping and vegetation deposition constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrbanConfig {
    /// Concentration gain per unit built fraction
    pub trapping_alpha: f64,
    /// Per-gas deposition constant applied against the green fraction
    pub deposition: GasRates,
    /// Deposition constant for gases missing from `deposition`
    pub fallback_deposition: f64,
}

impl Default for UrbanConfig {
    fn default() -> Self {
        Self {
            trapping_alpha: 0.40,
            deposition: gas_rates([
                (Pollutant::Pm25, 0.20),
                (Pollutant::Pm10, 0.25),
                (Pollutant::No2, 0.10),
                (Pollutant::So2, 0.12),
                (Pollutant::O3, 0.15),
                (Pollutant::Nh3, 0.08),
                (Pollutant::No, 0.06),
                (Pollutant::Co, 0.01),
            ]),
            fallback_deposition: 0.05,
        }
    }
}

/// Applies `C · (1 + α·built) · exp(−k_gas·green)` to a field.
#[derive(Debug, Clone, Copy)]
pub struct UrbanModifier<'a> {
    config: &'a UrbanConfig,
}

impl<'a> UrbanModifier<'a> {
    #[must_use]
    pub fn new(config: &'a UrbanConfig) -> Self {
        Self { config }
    }

    /// Deposition constant for `gas`.
    #[must_use]
    pub fn deposition_rate(&self, gas: Pollutant) -> f64 {
        self.config
            .deposition
            .get(&gas)
            .copied()
            .unwrap_or(self.config.fallback_deposition)
    }

    /// Combined multiplier for one gas. Fractions are clamped to `[0, 1]`.
    #[must_use]
    pub fn factor(&self, gas: Pollutant, built: f64, green: f64) -> f64 {
        let built = clamp_unit(built);
        let green = clamp_unit(green);
        let trapping = 1.0 + self.config.trapping_alpha * built;
        let deposition = (-self.deposition_rate(gas) * green).exp();
        trapping * deposition
    }

    /// Modified copy of `field`.
    #[must_use]
    pub fn apply(&self, field: &ConcentrationField, built: f64, green: f64) -> ConcentrationField {
        let mut out = field.clone();
        self.apply_in_place(&mut out, built, green);
        out
    }

    /// Modify `field` in place.
    pub fn apply_in_place(&self, field: &mut ConcentrationField, built: f64, green: f64) {
        let factors: GasRates = field
            .gases()
            .map(|gas| (gas, self.factor(gas, built, green)))
            .collect();
        field.map_in_place(|gas, v| v * factors[&gas]);
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn field() -> ConcentrationField {
        ConcentrationField::uniform(
            3,
            &gas_rates([(Pollutant::Pm25, 10.0), (Pollutant::Co, 100.0)]),
        )
    }

    #[test]
    fn open_bare_land_is_identity() {
        let config = UrbanConfig::default();
        let urban = UrbanModifier::new(&config);
        assert_eq!(urban.apply(&field(), 0.0, 0.0), field());
    }

    #[test]
    fn trapping_raises_and_greenery_lowers() {
        let config = UrbanConfig::default();
        let urban = UrbanModifier::new(&config);
        let built = urban.apply(&field(), 1.0, 0.0);
        assert_relative_eq!(built.get(Pollutant::Pm25).unwrap()[0], 14.0, epsilon = 1e-12);

        let green = urban.apply(&field(), 0.0, 1.0);
        assert_relative_eq!(
            green.get(Pollutant::Pm25).unwrap()[1],
            10.0 * (-0.20_f64).exp(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            green.get(Pollutant::Co).unwrap()[2],
            100.0 * (-0.01_f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn full_greenery_reduces_every_gas() {
        let config = UrbanConfig::default();
        let urban = UrbanModifier::new(&config);
        let base = ConcentrationField::uniform(
            4,
            &Pollutant::ALL.iter().map(|&gas| (gas, 25.0)).collect(),
        );
        let green = urban.apply(&base, 0.0, 1.0);
        for gas in Pollutant::ALL {
            assert!(urban.deposition_rate(gas) > 0.0, "{gas}");
            for (&after, &before) in green.get(gas).unwrap().iter().zip(base.get(gas).unwrap()) {
                assert!(after < before, "{gas}: {after} !< {before}");
                assert!(after >= 0.0, "{gas}: {after}");
            }
        }
    }

    #[test]
    fn fractions_are_clamped() {
        let config = UrbanConfig::default();
        let urban = UrbanModifier::new(&config);
        assert_eq!(
            urban.factor(Pollutant::No2, 3.0, -1.0),
            urban.factor(Pollutant::No2, 1.0, 0.0)
        );
        assert_eq!(urban.factor(Pollutant::No2, f64::NAN, f64::NAN), 1.0);
    }

    #[test]
    fn unlisted_gas_uses_fallback() {
        let config = UrbanConfig {
            deposition: GasRates::new(),
            ..UrbanConfig::default()
        };
        let urban = UrbanModifier::new(&config);
        assert_eq!(urban.deposition_rate(Pollutant::O3), 0.05);
    }
}
