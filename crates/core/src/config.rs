//! Injected model constants.
//!
//! Every lookup table used by the engine lives in [`DispersionConfig`]. The
//! defaults reproduce the calibrated reference model; a JSON file can
//! override any subset of fields, e.g.
//!
//! ```json
//! { "scenario": { "receptor_spacing": 100.0 },
//!   "plume": { "stability_class": 4 } }
//! ```

use crate::core_types::BackgroundLevels;
use crate::dispersion::{PlumeConfig, RoughnessConfig, StabilityTable, UrbanConfig};
use crate::emissions::{SourceConfig, VehicleEmissionModel};
use crate::error::{PlumeError, PlumeResult};
use crate::geometry::UtmProjection;
use crate::receptors::DEFAULT_MAX_RECEPTORS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Scenario wiring constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Receptor grid spacing (m)
    pub receptor_spacing: f64,
    /// Simulation output → reported units (g/m³ → µg/m³)
    pub unit_conversion: f64,
    /// Population used when the population service fails
    pub fallback_population: f64,
    /// Background used when none is supplied and the lookup fails
    pub fallback_background: BackgroundLevels,
    /// Projection for site polygons and features
    pub projection: UtmProjection,
    /// Deadline for each external lookup (ms)
    pub io_timeout_ms: u64,
    /// Buffer around the site searched for green patches (m)
    pub green_buffer: f64,
    /// Green patches at or below this clipped area are ignored (m²)
    pub min_green_patch: f64,
    /// Ground footprint assumed per building (m²)
    pub building_footprint: f64,
    /// Sites needing more receptors than this are rejected
    pub max_receptors: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            receptor_spacing: 250.0,
            unit_conversion: 1e6,
            fallback_population: 0.0,
            fallback_background: BackgroundLevels::fallback(),
            projection: UtmProjection::default(),
            io_timeout_ms: 10_000,
            green_buffer: 150.0,
            min_green_patch: 50.0,
            building_footprint: 120.0,
            max_receptors: DEFAULT_MAX_RECEPTORS,
        }
    }
}

impl ScenarioConfig {
    /// Deadline for each external lookup.
    #[must_use]
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispersionConfig {
    pub stability: StabilityTable,
    pub plume: PlumeConfig,
    pub roughness: RoughnessConfig,
    pub urban: UrbanConfig,
    pub sources: SourceConfig,
    pub vehicles: VehicleEmissionModel,
    pub scenario: ScenarioConfig,
}

impl DispersionConfig {
    /// Parse and validate a JSON document; missing fields take defaults.
    pub fn from_json_str(json: &str) -> PlumeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> PlumeResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| PlumeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Pretty JSON, suitable for writing a template file.
    pub fn to_json_string(&self) -> PlumeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> PlumeResult<()> {
        positive("scenario.receptor_spacing", self.scenario.receptor_spacing)?;
        positive("scenario.unit_conversion", self.scenario.unit_conversion)?;
        non_negative("scenario.fallback_population", self.scenario.fallback_population)?;
        non_negative("scenario.green_buffer", self.scenario.green_buffer)?;
        non_negative("scenario.min_green_patch", self.scenario.min_green_patch)?;
        non_negative("scenario.building_footprint", self.scenario.building_footprint)?;
        if self.scenario.max_receptors == 0 {
            return Err(PlumeError::invalid_config(
                "scenario.max_receptors",
                "must be at least 1",
            ));
        }
        if !(1..=60).contains(&self.scenario.projection.zone) {
            return Err(PlumeError::invalid_config(
                "scenario.projection.zone",
                format!("must be 1-60, got {}", self.scenario.projection.zone),
            ));
        }

        positive("sources.road_spacing", self.sources.road_spacing)?;
        non_negative("sources.road_height", self.sources.road_height)?;
        non_negative("sources.industry_height", self.sources.industry_height)?;
        non_negative("sources.building_height", self.sources.building_height)?;
        let industry = &self.sources.industry;
        if industry.large_area_threshold < industry.medium_area_threshold {
            return Err(PlumeError::invalid_config(
                "sources.industry.large_area_threshold",
                "must not be below medium_area_threshold",
            ));
        }

        positive("plume.sigma_floor", self.plume.sigma_floor)?;
        positive("plume.min_wind_speed", self.plume.min_wind_speed)?;
        if self.stability.classes.len() != 6 {
            return Err(PlumeError::invalid_config(
                "stability.classes",
                format!("expected 6 class curves, got {}", self.stability.classes.len()),
            ));
        }
        if self.stability.classes.iter().any(|c| c.bins.is_empty()) {
            return Err(PlumeError::invalid_config(
                "stability.classes",
                "every class needs at least one bin",
            ));
        }

        positive("roughness.base_z0", self.roughness.base_z0)?;
        non_negative("roughness.built_z0_gain", self.roughness.built_z0_gain)?;
        let r = &self.roughness;
        if r.reference_height.is_nan() || r.reference_height <= r.base_z0 {
            return Err(PlumeError::invalid_config(
                "roughness.reference_height",
                "must exceed base_z0",
            ));
        }
        positive("roughness.min_effective_speed", self.roughness.min_effective_speed)?;

        non_negative("urban.trapping_alpha", self.urban.trapping_alpha)?;
        non_negative("urban.fallback_deposition", self.urban.fallback_deposition)?;
        if let Some((gas, _)) = self
            .urban
            .deposition
            .iter()
            .find(|(_, k)| !k.is_finite() || **k < 0.0)
        {
            return Err(PlumeError::invalid_config(
                "urban.deposition",
                format!("{gas} constant must be finite and non-negative"),
            ));
        }

        positive("vehicles.seconds_per_day", self.vehicles.seconds_per_day)?;
        non_negative("vehicles.trips_per_person", self.vehicles.trips_per_person)?;
        non_negative("vehicles.road_dust_factor", self.vehicles.road_dust_factor)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> PlumeResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PlumeError::invalid_config(
            field,
            format!("must be positive, got {value}"),
        ))
    }
}

fn non_negative(field: &'static str, value: f64) -> PlumeResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PlumeError::invalid_config(
            field,
            format!("must be non-negative, got {value}"),
        ))
    }
}
