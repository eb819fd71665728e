//! Per-gas concentration series aligned with a receptor grid.

use super::pollutant::{GasRates, Pollutant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Concentrations for each gas, one value per receptor.
///
/// Every series has exactly `receptor_count` entries, in receptor order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConcentrationField {
    receptor_count: usize,
    values: BTreeMap<Pollutant, Vec<f64>>,
}

impl ConcentrationField {
    /// Field with no gases yet.
    #[must_use]
    pub fn empty(receptor_count: usize) -> Self {
        Self {
            receptor_count,
            values: BTreeMap::new(),
        }
    }

    /// Zero-filled series for each listed gas.
    #[must_use]
    pub fn zeros<I>(receptor_count: usize, gases: I) -> Self
    where
        I: IntoIterator<Item = Pollutant>,
    {
        Self {
            receptor_count,
            values: gases
                .into_iter()
                .map(|gas| (gas, vec![0.0; receptor_count]))
                .collect(),
        }
    }

    /// Spatially uniform field, e.g. a background level everywhere.
    #[must_use]
    pub fn uniform(receptor_count: usize, levels: &GasRates) -> Self {
        Self {
            receptor_count,
            values: levels
                .iter()
                .map(|(&gas, &level)| (gas, vec![level; receptor_count]))
                .collect(),
        }
    }

    /// Field from receptor-major values: `values[i * gases.len() + k]` is
    /// gas `k` at receptor `i`.
    #[must_use]
    pub fn from_interleaved(receptor_count: usize, gases: &[Pollutant], values: &[f64]) -> Self {
        debug_assert_eq!(values.len(), receptor_count * gases.len());
        let stride = gases.len();
        Self {
            receptor_count,
            values: gases
                .iter()
                .enumerate()
                .map(|(k, &gas)| {
                    let series = values.iter().skip(k).step_by(stride).copied().collect();
                    (gas, series)
                })
                .collect(),
        }
    }

    /// Number of receptors each series covers.
    #[must_use]
    pub fn receptor_count(&self) -> usize {
        self.receptor_count
    }

    /// Gases present, in canonical order.
    pub fn gases(&self) -> impl Iterator<Item = Pollutant> + '_ {
        self.values.keys().copied()
    }

    /// True when no gas is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Series for `gas`.
    #[must_use]
    pub fn get(&self, gas: Pollutant) -> Option<&[f64]> {
        self.values.get(&gas).map(Vec::as_slice)
    }

    /// Iterate `(gas, series)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, &[f64])> + '_ {
        self.values.iter().map(|(&gas, series)| (gas, series.as_slice()))
    }

    /// Mutable series for `gas`, created zero-filled when missing.
    pub fn series_mut(&mut self, gas: Pollutant) -> &mut [f64] {
        let n = self.receptor_count;
        self.values.entry(gas).or_insert_with(|| vec![0.0; n])
    }

    /// `self[gas] += scale * unit` element-wise.
    pub fn add_scaled(&mut self, gas: Pollutant, unit: &[f64], scale: f64) {
        debug_assert_eq!(unit.len(), self.receptor_count);
        for (dst, &u) in self.series_mut(gas).iter_mut().zip(unit) {
            *dst += u * scale;
        }
    }

    /// Add another field gas-by-gas; gases missing on either side count as zero.
    pub fn accumulate(&mut self, other: &ConcentrationField) {
        for (gas, series) in other.iter() {
            for (dst, &v) in self.series_mut(gas).iter_mut().zip(series) {
                *dst += v;
            }
        }
    }

    /// Apply `f(gas, value)` to every value.
    pub fn map_in_place<F>(&mut self, mut f: F)
    where
        F: FnMut(Pollutant, f64) -> f64,
    {
        for (&gas, series) in &mut self.values {
            for v in series.iter_mut() {
                *v = f(gas, *v);
            }
        }
    }

    /// Replace NaN/±Inf by zero; returns how many values were replaced.
    pub fn sanitize(&mut self) -> usize {
        let mut replaced = 0;
        self.map_in_place(|_, v| {
            if v.is_finite() {
                v
            } else {
                replaced += 1;
                0.0
            }
        });
        replaced
    }

    /// Arithmetic mean of one gas over all receptors (0 for an empty grid).
    #[must_use]
    pub fn mean(&self, gas: Pollutant) -> Option<f64> {
        let series = self.values.get(&gas)?;
        if series.is_empty() {
            return Some(0.0);
        }
        Some(series.iter().sum::<f64>() / series.len() as f64)
    }

    /// Per-gas spatial means.
    #[must_use]
    pub fn means(&self) -> GasRates {
        self.values
            .keys()
            .filter_map(|&gas| self.mean(gas).map(|m| (gas, m)))
            .collect()
    }

    /// Per-gas maxima.
    #[must_use]
    pub fn maxima(&self) -> GasRates {
        self.values
            .iter()
            .map(|(&gas, series)| {
                let max = series.iter().copied().fold(0.0_f64, f64::max);
                (gas, max)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::pollutant::gas_rates;
    use approx::assert_relative_eq;

    #[test]
    fn series_length_matches_receptor_count() {
        let mut field = ConcentrationField::zeros(4, [Pollutant::Pm25]);
        assert_eq!(field.get(Pollutant::Pm25).unwrap().len(), 4);
        assert_eq!(field.series_mut(Pollutant::Co).len(), 4);
        assert_eq!(field.gases().count(), 2);
    }

    #[test]
    fn add_scaled_and_mean() {
        let mut field = ConcentrationField::empty(3);
        field.add_scaled(Pollutant::No2, &[1.0, 2.0, 3.0], 2.0);
        assert_eq!(field.get(Pollutant::No2).unwrap(), &[2.0, 4.0, 6.0]);
        assert_relative_eq!(field.mean(Pollutant::No2).unwrap(), 4.0);
        assert!(field.mean(Pollutant::Co).is_none());
        assert_eq!(field.maxima()[&Pollutant::No2], 6.0);
    }

    #[test]
    fn accumulate_unions_gases() {
        let mut a = ConcentrationField::uniform(2, &gas_rates([(Pollutant::Pm25, 1.0)]));
        let b = ConcentrationField::uniform(2, &gas_rates([(Pollutant::Co, 5.0)]));
        a.accumulate(&b);
        assert_eq!(a.get(Pollutant::Pm25).unwrap(), &[1.0, 1.0]);
        assert_eq!(a.get(Pollutant::Co).unwrap(), &[5.0, 5.0]);
    }

    #[test]
    fn sanitize_removes_non_finite() {
        let mut field = ConcentrationField::empty(3);
        field
            .series_mut(Pollutant::O3)
            .copy_from_slice(&[1.0, f64::NAN, f64::INFINITY]);
        assert_eq!(field.sanitize(), 2);
        assert_eq!(field.get(Pollutant::O3).unwrap(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_grid_mean_is_zero() {
        let field = ConcentrationField::zeros(0, [Pollutant::Pm10]);
        assert_eq!(field.mean(Pollutant::Pm10), Some(0.0));
    }

    #[test]
    fn interleaved_values_split_per_gas() {
        let gases = [Pollutant::Co, Pollutant::Pm25];
        let field =
            ConcentrationField::from_interleaved(3, &gases, &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);
        assert_eq!(field.receptor_count(), 3);
        assert_eq!(field.get(Pollutant::Co).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(field.get(Pollutant::Pm25).unwrap(), &[10.0, 20.0, 30.0]);
    }
}
