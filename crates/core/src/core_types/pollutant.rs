//! Pollutant vocabulary and per-gas rate maps.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A pollutant species tracked by the dispersion engine.
///
/// Serialized names match the identifiers used by the live background feed
/// (`pm2_5`, `pm10`, `co`, ...), so configuration and background JSON can be
/// read without remapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    /// Fine particulate matter (≤ 2.5 µm)
    #[serde(rename = "pm2_5")]
    Pm25,
    /// Coarse particulate matter (≤ 10 µm)
    Pm10,
    /// Carbon monoxide
    Co,
    /// Nitrogen dioxide
    No2,
    /// Sulphur dioxide
    So2,
    /// Nitric oxide
    No,
    /// Ammonia
    Nh3,
    /// Ozone
    O3,
}

impl Pollutant {
    /// Every known species, in serialization order.
    pub const ALL: [Pollutant; 8] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::Co,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::No,
        Pollutant::Nh3,
        Pollutant::O3,
    ];

    /// Identifier used in JSON and log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm2_5",
            Pollutant::Pm10 => "pm10",
            Pollutant::Co => "co",
            Pollutant::No2 => "no2",
            Pollutant::So2 => "so2",
            Pollutant::No => "no",
            Pollutant::Nh3 => "nh3",
            Pollutant::O3 => "o3",
        }
    }

    /// Particulates pick up re-suspended road dust on top of exhaust.
    #[must_use]
    pub const fn is_particulate(self) -> bool {
        matches!(self, Pollutant::Pm25 | Pollutant::Pm10)
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pollutant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['.', '-'], "_");
        Pollutant::ALL
            .into_iter()
            .find(|gas| gas.as_str() == normalized || gas.as_str().replace('_', "") == normalized)
            .ok_or_else(|| format!("unknown pollutant '{s}'"))
    }
}

/// Per-gas scalar values: emission rates (g/s), background levels or means.
///
/// A gas missing from the map is treated as zero everywhere.
pub type GasRates = BTreeMap<Pollutant, f64>;

/// Look up a gas, defaulting to zero when absent.
#[inline]
#[must_use]
pub fn rate_of(rates: &GasRates, gas: Pollutant) -> f64 {
    rates.get(&gas).copied().unwrap_or(0.0)
}

/// Union of the gases present in any of the given maps.
pub fn gas_union<'a, I>(maps: I) -> BTreeSet<Pollutant>
where
    I: IntoIterator<Item = &'a GasRates>,
{
    maps.into_iter()
        .flat_map(|rates| rates.keys().copied())
        .collect()
}

/// Build a rate map from `(gas, value)` pairs.
#[must_use]
pub fn gas_rates<const N: usize>(pairs: [(Pollutant, f64); N]) -> GasRates {
    pairs.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for gas in Pollutant::ALL {
            assert_eq!(gas.as_str().parse::<Pollutant>(), Ok(gas));
        }
        assert_eq!("PM2.5".parse::<Pollutant>(), Ok(Pollutant::Pm25));
        assert_eq!("pm25".parse::<Pollutant>(), Ok(Pollutant::Pm25));
        assert!("benzene".parse::<Pollutant>().is_err());
    }

    #[test]
    fn serde_uses_feed_identifiers() {
        let rates = gas_rates([(Pollutant::Pm25, 1.5), (Pollutant::No2, 0.25)]);
        let json = serde_json::to_string(&rates).unwrap();
        assert_eq!(json, r#"{"pm2_5":1.5,"no2":0.25}"#);

        let back: GasRates = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rates);
    }

    #[test]
    fn union_covers_every_map() {
        let a = gas_rates([(Pollutant::Pm25, 1.0)]);
        let b = gas_rates([(Pollutant::Co, 2.0), (Pollutant::Pm25, 0.5)]);
        let union = gas_union([&a, &b]);
        assert_eq!(
            union.into_iter().collect::<Vec<_>>(),
            vec![Pollutant::Pm25, Pollutant::Co]
        );
        assert_eq!(rate_of(&a, Pollutant::Co), 0.0);
    }

    #[test]
    fn only_pm_is_particulate() {
        let particulate: Vec<_> = Pollutant::ALL
            .into_iter()
            .filter(|gas| gas.is_particulate())
            .collect();
        assert_eq!(particulate, vec![Pollutant::Pm25, Pollutant::Pm10]);
    }
}
