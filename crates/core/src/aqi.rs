//! Inputs for, and interpretation of, air-quality-index estimators.
//!
//! The estimators themselves (regression models trained on station data)
//! live outside this crate behind [`AqiEstimator`].

use crate::core_types::{rate_of, GasRates, Pollutant};
use crate::error::PlumeResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Fixed aromatic levels (µg/m³) fed to estimators, which were trained with
/// these columns but are not modelled here.
pub const BENZENE: f64 = 6.32;
pub const TOLUENE: f64 = 11.75;
pub const XYLENE: f64 = 1.0;

/// One row of estimator input, named after the station-data columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AqiFeatures {
    #[serde(rename = "PM2.5")]
    pub pm2_5: f64,
    #[serde(rename = "PM10")]
    pub pm10: f64,
    #[serde(rename = "NO")]
    pub no: f64,
    #[serde(rename = "NO2")]
    pub no2: f64,
    #[serde(rename = "NOx")]
    pub nox: f64,
    #[serde(rename = "NH3")]
    pub nh3: f64,
    /// mg/m³
    #[serde(rename = "CO")]
    pub co: f64,
    #[serde(rename = "SO2")]
    pub so2: f64,
    #[serde(rename = "O3")]
    pub o3: f64,
    #[serde(rename = "Benzene")]
    pub benzene: f64,
    #[serde(rename = "Toluene")]
    pub toluene: f64,
    #[serde(rename = "Xylene")]
    pub xylene: f64,
}

impl AqiFeatures {
    /// Map per-gas means (µg/m³) to estimator columns.
    ///
    /// NOx is NO + NO2, CO is converted to mg/m³, missing gases are zero.
    #[must_use]
    pub fn from_means(means: &GasRates) -> Self {
        let get = |gas| rate_of(means, gas);
        Self {
            pm2_5: get(Pollutant::Pm25),
            pm10: get(Pollutant::Pm10),
            no: get(Pollutant::No),
            no2: get(Pollutant::No2),
            nox: get(Pollutant::No) + get(Pollutant::No2),
            nh3: get(Pollutant::Nh3),
            co: get(Pollutant::Co) / 1000.0,
            so2: get(Pollutant::So2),
            o3: get(Pollutant::O3),
            benzene: BENZENE,
            toluene: TOLUENE,
            xylene: XYLENE,
        }
    }

    /// `(column, value)` pairs in training-column order.
    #[must_use]
    pub fn columns(&self) -> [(&'static str, f64); 12] {
        [
            ("PM2.5", self.pm2_5),
            ("PM10", self.pm10),
            ("NO", self.no),
            ("NO2", self.no2),
            ("NOx", self.nox),
            ("NH3", self.nh3),
            ("CO", self.co),
            ("SO2", self.so2),
            ("O3", self.o3),
            ("Benzene", self.benzene),
            ("Toluene", self.toluene),
            ("Xylene", self.xylene),
        ]
    }
}

/// Air-quality category for an index value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AqiStatus {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    VeryPoor,
    Severe,
}

impl AqiStatus {
    /// Category bounds are inclusive upper limits: 50, 100, 200, 300, 400.
    #[must_use]
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi <= 50.0 {
            Self::Good
        } else if aqi <= 100.0 {
            Self::Satisfactory
        } else if aqi <= 200.0 {
            Self::Moderate
        } else if aqi <= 300.0 {
            Self::Poor
        } else if aqi <= 400.0 {
            Self::VeryPoor
        } else {
            Self::Severe
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Satisfactory => "Satisfactory",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
            Self::Severe => "Severe",
        }
    }
}

impl fmt::Display for AqiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A model predicting an index value from pollutant levels.
pub trait AqiEstimator: Send + Sync {
    /// Name shown next to the prediction.
    fn name(&self) -> &str;

    /// Predicted index for `features` in `city`.
    fn predict(&self, features: &AqiFeatures, city: &str) -> PlumeResult<f64>;
}

/// Always predicts the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantAqi {
    pub name: String,
    pub value: f64,
}

impl ConstantAqi {
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl AqiEstimator for ConstantAqi {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, _features: &AqiFeatures, _city: &str) -> PlumeResult<f64> {
        Ok(self.value)
    }
}

/// Averaged prediction over several estimators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiAssessment {
    /// `(estimator, prediction)` for every estimator that answered
    pub predictions: Vec<(String, f64)>,
    pub average: f64,
    pub status: AqiStatus,
}

impl AqiAssessment {
    /// Average all finite predictions. Estimators that fail are logged and
    /// skipped; `None` when none answered.
    #[must_use]
    pub fn assess(
        estimators: &[Box<dyn AqiEstimator>],
        features: &AqiFeatures,
        city: &str,
    ) -> Option<Self> {
        let predictions: Vec<(String, f64)> = estimators
            .iter()
            .filter_map(|est| match est.predict(features, city) {
                Ok(v) if v.is_finite() => Some((est.name().to_string(), v)),
                Ok(v) => {
                    warn!("AQI estimator '{}' returned {}, skipping", est.name(), v);
                    None
                }
                Err(e) => {
                    warn!("AQI estimator '{}' failed: {}", est.name(), e);
                    None
                }
            })
            .collect();

        if predictions.is_empty() {
            return None;
        }
        let average =
            predictions.iter().map(|(_, v)| v).sum::<f64>() / predictions.len() as f64;
        Some(Self {
            predictions,
            average,
            status: AqiStatus::from_aqi(average),
        })
    }
}
