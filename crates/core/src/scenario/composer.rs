//! One scenario evaluation, from site polygon to final concentration field.
//!
//! Work is split in two phases. [`ScenarioComposer::prepare`] does everything
//! that touches the outside world (polygon repair, external lookups with
//! deadlines, receptor grid, site metrics) and produces a [`SiteContext`].
//! [`ScenarioComposer::evaluate`] is then a pure function of that context, a
//! parameter set and the wind, so several scenarios can share one context
//! and run in parallel.

use crate::config::DispersionConfig;
use crate::core_types::{
    gas_union, BackgroundLevels, ConcentrationField, EmissionSource, GasRates, ScenarioParameters,
    SourceCounts, Wind,
};
use crate::dispersion::{DispersionAggregator, PlumeEvaluator, StabilityModel, UrbanModifier};
use crate::emissions::{SourceApportioner, VehicleEmissionEstimator};
use crate::error::{PlumeError, PlumeResult};
use crate::external::{
    BackgroundProvider, FeatureProvider, MetricsCache, MetricsKey, PendingCall,
    PopulationProvider, SiteFeatures, SiteMetrics, StaticBackground, StaticFeatures,
    StaticPopulation,
};
use crate::geometry::{Bounds, Polygon};
use crate::receptors::ReceptorGrid;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// External collaborators used while preparing a site.
#[derive(Clone)]
pub struct Services {
    /// Resident count inside the site ring
    pub population: Arc<dyn PopulationProvider>,
    /// Measured ambient levels near the site
    pub background: Arc<dyn BackgroundProvider>,
    /// Roads, parcels and green cover in projected metres
    pub features: Arc<dyn FeatureProvider>,
}

impl Services {
    #[must_use]
    pub fn new(
        population: Arc<dyn PopulationProvider>,
        background: Arc<dyn BackgroundProvider>,
        features: Arc<dyn FeatureProvider>,
    ) -> Self {
        Self {
            population,
            background,
            features,
        }
    }

    /// Fixed in-memory answers; no I/O.
    #[must_use]
    pub fn in_memory(population: f64, background: BackgroundLevels, features: SiteFeatures) -> Self {
        Self::new(
            Arc::new(StaticPopulation(population)),
            Arc::new(StaticBackground(background)),
            Arc::new(StaticFeatures(features)),
        )
    }
}

impl Default for Services {
    /// Nobody living there, fallback background, no features.
    fn default() -> Self {
        Self::in_memory(0.0, BackgroundLevels::fallback(), SiteFeatures::default())
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// Everything about a site that does not depend on scenario parameters.
#[derive(Debug, Clone)]
pub struct SiteContext {
    /// Repaired site ring in WGS84 lon/lat
    pub site_lon_lat: Polygon,
    /// Repaired site ring in projected metres
    pub site: Polygon,
    /// Projected bounds the grid covers
    pub bounds: Bounds,
    pub grid: Arc<ReceptorGrid>,
    pub background: BackgroundLevels,
    /// Present-day resident population
    pub population: f64,
    pub features: SiteFeatures,
    pub metrics: SiteMetrics,
    /// Fallbacks taken while preparing
    pub warnings: Vec<String>,
}

/// Result of one scenario evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub parameters: ScenarioParameters,
    /// Reported concentrations: simulated increment + background (µg/m³)
    pub field: ConcentrationField,
    /// Modelled increment alone, before background is added (µg/m³)
    pub simulated: ConcentrationField,
    #[serde(skip)]
    pub grid: Arc<ReceptorGrid>,
    /// Per-gas spatial means of `field`
    pub means: GasRates,
    /// Per-gas spatial means of `simulated`
    pub simulated_means: GasRates,
    pub source_counts: SourceCounts,
    /// Projected population used for traffic
    pub population: f64,
    /// Wind speed after the roughness adjustment (m/s)
    pub effective_wind_speed: f64,
    pub warnings: Vec<String>,
}

/// Wires apportionment, dispersion and urban corrections together.
#[derive(Debug)]
pub struct ScenarioComposer {
    config: DispersionConfig,
    stability: StabilityModel,
    metrics: MetricsCache,
}

impl Default for ScenarioComposer {
    fn default() -> Self {
        Self::new(DispersionConfig::default())
    }
}

impl ScenarioComposer {
    #[must_use]
    pub fn new(config: DispersionConfig) -> Self {
        let stability = StabilityModel::new(config.stability.clone());
        Self {
            config,
            stability,
            metrics: MetricsCache::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DispersionConfig {
        &self.config
    }

    /// Site metrics memoised so far.
    #[must_use]
    pub fn metrics_cache(&self) -> &MetricsCache {
        &self.metrics
    }

    /// Repair and project the site, gather external data and build the grid.
    ///
    /// Lookups run concurrently, each bounded by the configured timeout. A
    /// failed or late lookup is replaced by its fallback and reported in
    /// `warnings`. `background` skips the background lookup when supplied.
    ///
    /// Fails when the site polygon cannot be repaired, is not in WGS84
    /// degrees, or would need more receptors than the configured maximum.
    pub fn prepare(
        &self,
        site_lon_lat: &Polygon,
        background: Option<BackgroundLevels>,
        services: &Services,
    ) -> PlumeResult<SiteContext> {
        let scenario = &self.config.scenario;
        let site_lon_lat = site_lon_lat.repaired()?;
        if let Some(p) = site_lon_lat
            .vertices()
            .iter()
            .find(|p| !(-180.0..=180.0).contains(&p.x) || !(-90.0..=90.0).contains(&p.y))
        {
            return Err(PlumeError::invalid_polygon(format!(
                "vertex ({}, {}) is not a WGS84 longitude/latitude",
                p.x, p.y
            )));
        }
        let site = site_lon_lat.project(&scenario.projection);
        let bounds = site
            .bounds()
            .filter(|b| b.width().is_finite() && b.height().is_finite())
            .ok_or_else(|| PlumeError::invalid_polygon("projection produced no finite bounds"))?;
        let grid = Arc::new(ReceptorGrid::over_bounds(
            &bounds,
            scenario.receptor_spacing,
            scenario.max_receptors,
        )?);

        let deadline = Instant::now() + scenario.io_timeout();
        let pending_background = background.is_none().then(|| {
            let provider = Arc::clone(&services.background);
            let ring = site_lon_lat.clone();
            PendingCall::spawn("background", move || provider.background(&ring))
        });
        let pending_population = {
            let provider = Arc::clone(&services.population);
            let ring = site_lon_lat.clone();
            PendingCall::spawn("population", move || provider.population(&ring))
        };
        let pending_features = {
            let provider = Arc::clone(&services.features);
            let ring = site.clone();
            PendingCall::spawn("features", move || provider.features(&ring))
        };

        let mut warnings = Vec::new();

        let background = match (background, pending_background) {
            (Some(supplied), _) => supplied,
            (None, Some(call)) => call.wait_until(deadline).unwrap_or_else(|e| {
                fallback_warning(&mut warnings, &e, "using fallback background");
                scenario.fallback_background.clone()
            }),
            (None, None) => scenario.fallback_background.clone(),
        };

        let population = match pending_population.wait_until(deadline) {
            Ok(p) if p.is_finite() && p >= 0.0 => p,
            Ok(p) => {
                let msg = format!(
                    "population service returned {p}, using fallback {}",
                    scenario.fallback_population
                );
                warn!("{}", msg);
                warnings.push(msg);
                scenario.fallback_population
            }
            Err(e) => {
                fallback_warning(
                    &mut warnings,
                    &e,
                    &format!("using fallback population {}", scenario.fallback_population),
                );
                scenario.fallback_population
            }
        };

        let features = match pending_features.wait_until(deadline) {
            Ok(f) => f.near(&site, scenario.green_buffer),
            Err(e) => {
                fallback_warning(&mut warnings, &e, "continuing without features");
                SiteFeatures::default()
            }
        };

        let key = MetricsKey::new(&site, &features, population);
        let metrics = self.metrics.get_or_insert_with(key, || {
            SiteMetrics::compute(&site, &features, population, scenario)
        });

        info!(
            "Site prepared: {:.0} m², {} receptors, population {:.0}, {} roads, {} industrial, {} buildings",
            metrics.area,
            grid.len(),
            population,
            features.roads.len(),
            features.industry.len(),
            features.buildings.len()
        );

        Ok(SiteContext {
            site_lon_lat,
            site,
            bounds,
            grid,
            background,
            population,
            features,
            metrics,
            warnings,
        })
    }

    /// Pooled point sources for a parameter set.
    #[must_use]
    pub fn sources(&self, context: &SiteContext, parameters: &ScenarioParameters) -> Vec<EmissionSource> {
        let population = context.population * parameters.population_multiplier();
        let totals = VehicleEmissionEstimator::new(&self.config.vehicles).estimate(population);
        let apportioner = SourceApportioner::new(&self.config.sources);

        let mut sources = apportioner.road_sources(&context.features.roads, &totals);
        sources.extend(apportioner.industry_sources(&context.features.industry));
        sources.extend(apportioner.configured_building_sources(&context.features.buildings));
        sources
    }

    /// Evaluate one parameter set against a prepared site. Pure.
    #[must_use]
    pub fn evaluate(
        &self,
        context: &SiteContext,
        parameters: &ScenarioParameters,
        wind: &Wind,
    ) -> ScenarioOutcome {
        let built = parameters.built_fraction();
        let green = parameters.green_fraction();
        let population = context.population * parameters.population_multiplier();
        let sources = self.sources(context, parameters);
        let source_counts = SourceCounts::tally(&sources);

        let plume = PlumeEvaluator::new(&self.stability, self.config.plume);
        let aggregator = DispersionAggregator::new(plume, self.config.roughness);
        let mut simulated = aggregator.run(&sources, &context.grid, wind, built);
        UrbanModifier::new(&self.config.urban).apply_in_place(&mut simulated, built, green);

        let unit = self.config.scenario.unit_conversion;
        simulated.map_in_place(|_, v| v * unit);

        let mut warnings = context.warnings.clone();
        let replaced = simulated.sanitize();
        if replaced > 0 {
            let msg = format!("{replaced} non-finite concentrations replaced by zero");
            warn!("{}", msg);
            warnings.push(msg);
        }

        let background = context.background.as_rates();
        let n = context.grid.len();
        let mut field = ConcentrationField::zeros(n, gas_union([&simulated.means(), background]));
        field.accumulate(&simulated);
        field.accumulate(&ConcentrationField::uniform(n, background));

        let means = field.means();
        let simulated_means = simulated.means();
        let effective_wind_speed = aggregator.roughness().effective_wind(wind, built).speed;

        debug!(
            "Scenario built={:.2} green={:.2} pop={:.0}: {} sources ({} road, {} industry, {} building)",
            built,
            green,
            population,
            source_counts.total(),
            source_counts.roads,
            source_counts.industry,
            source_counts.buildings
        );

        ScenarioOutcome {
            parameters: *parameters,
            field,
            simulated,
            grid: Arc::clone(&context.grid),
            means,
            simulated_means,
            source_counts,
            population,
            effective_wind_speed,
            warnings,
        }
    }

    /// Prepare the site and evaluate a single parameter set.
    pub fn run(
        &self,
        site_lon_lat: &Polygon,
        parameters: &ScenarioParameters,
        wind: &Wind,
        background: Option<BackgroundLevels>,
        services: &Services,
    ) -> PlumeResult<ScenarioOutcome> {
        let context = self.prepare(site_lon_lat, background, services)?;
        Ok(self.evaluate(&context, parameters, wind))
    }
}

fn fallback_warning(warnings: &mut Vec<String>, error: &PlumeError, action: &str) {
    let msg = format!("{error}; {action}");
    warn!("{}", msg);
    warnings.push(msg);
}
