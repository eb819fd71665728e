//! Base vs. future scenario comparison.

use super::composer::{ScenarioComposer, ScenarioOutcome, Services, SiteContext};
use crate::aqi::AqiFeatures;
use crate::core_types::{
    gas_union, rate_of, BackgroundLevels, ConcentrationField, GasRates, ScenarioParameters, Wind,
};
use crate::error::PlumeResult;
use crate::geometry::Polygon;
use crate::receptors::ReceptorGrid;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// How the two scenarios are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Each scenario as modelled, background added to both
    Absolute,
    /// Base reported as the measured background; future as background plus
    /// the modelled change between the scenarios
    #[default]
    DeltaAnchored,
}

/// Reported fields and means for both scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub mode: ComparisonMode,
    pub background: BackgroundLevels,
    #[serde(skip)]
    pub grid: Arc<ReceptorGrid>,
    pub base_field: ConcentrationField,
    pub future_field: ConcentrationField,
    pub base_means: GasRates,
    /// In `DeltaAnchored` mode, background plus the change in simulated
    /// means, floored at zero. Not the mean of `future_field`.
    pub future_means: GasRates,
    /// Raw base evaluation
    pub base: ScenarioOutcome,
    /// Raw future evaluation
    pub future: ScenarioOutcome,
    pub warnings: Vec<String>,
}

impl ScenarioComparison {
    /// Reported future − base mean for every gas in either scenario.
    #[must_use]
    pub fn mean_changes(&self) -> GasRates {
        gas_union([&self.base_means, &self.future_means])
            .into_iter()
            .map(|gas| {
                (
                    gas,
                    rate_of(&self.future_means, gas) - rate_of(&self.base_means, gas),
                )
            })
            .collect()
    }

    /// AQI model inputs for the base scenario.
    #[must_use]
    pub fn base_aqi_features(&self) -> AqiFeatures {
        AqiFeatures::from_means(&self.base_means)
    }

    /// AQI model inputs for the future scenario.
    #[must_use]
    pub fn future_aqi_features(&self) -> AqiFeatures {
        AqiFeatures::from_means(&self.future_means)
    }
}

/// Runs two parameter sets over one prepared site.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioComparator<'a> {
    composer: &'a ScenarioComposer,
    mode: ComparisonMode,
}

impl<'a> ScenarioComparator<'a> {
    #[must_use]
    pub fn new(composer: &'a ScenarioComposer, mode: ComparisonMode) -> Self {
        Self { composer, mode }
    }

    #[must_use]
    pub fn mode(&self) -> ComparisonMode {
        self.mode
    }

    /// Evaluate both scenarios concurrently against the same grid and background.
    #[must_use]
    pub fn compare(
        &self,
        context: &SiteContext,
        base: &ScenarioParameters,
        future: &ScenarioParameters,
        wind: &Wind,
    ) -> ScenarioComparison {
        let (base_outcome, future_outcome) = rayon::join(
            || self.composer.evaluate(context, base, wind),
            || self.composer.evaluate(context, future, wind),
        );

        let background = context.background.clone();
        let (base_field, future_field, base_means, future_means) = match self.mode {
            ComparisonMode::Absolute => (
                base_outcome.field.clone(),
                future_outcome.field.clone(),
                base_outcome.means.clone(),
                future_outcome.means.clone(),
            ),
            ComparisonMode::DeltaAnchored => {
                anchor(&base_outcome, &future_outcome, &background, context.grid.len())
            }
        };

        info!(
            "Comparison ({:?}): {}",
            self.mode,
            gas_union([&base_means, &future_means])
                .into_iter()
                .map(|gas| format!(
                    "{gas} {:.2} -> {:.2}",
                    rate_of(&base_means, gas),
                    rate_of(&future_means, gas)
                ))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut warnings = context.warnings.clone();
        for w in base_outcome
            .warnings
            .iter()
            .chain(&future_outcome.warnings)
        {
            if !warnings.contains(w) {
                warnings.push(w.clone());
            }
        }

        ScenarioComparison {
            mode: self.mode,
            background,
            grid: Arc::clone(&context.grid),
            base_field,
            future_field,
            base_means,
            future_means,
            base: base_outcome,
            future: future_outcome,
            warnings,
        }
    }

    /// Prepare the site once, then compare.
    pub fn run(
        &self,
        site_lon_lat: &Polygon,
        base: &ScenarioParameters,
        future: &ScenarioParameters,
        wind: &Wind,
        background: Option<BackgroundLevels>,
        services: &Services,
    ) -> PlumeResult<ScenarioComparison> {
        let context = self.composer.prepare(site_lon_lat, background, services)?;
        Ok(self.compare(&context, base, future, wind))
    }
}

/// Background-anchored fields and means.
///
/// Per receptor: `future = max(bg + fut − base, 0)`, `base = bg`. Means are
/// `max(bg + Δmean, 0)` over the simulated means, not the mean of the
/// clamped future field. Where clamping bites, the field mean is the larger
/// of the two. Equal base and future means give exactly the background.
fn anchor(
    base: &ScenarioOutcome,
    future: &ScenarioOutcome,
    background: &BackgroundLevels,
    receptor_count: usize,
) -> (ConcentrationField, ConcentrationField, GasRates, GasRates) {
    let gases = gas_union([
        &base.simulated_means,
        &future.simulated_means,
        background.as_rates(),
    ]);

    let mut base_field = ConcentrationField::zeros(receptor_count, gases.iter().copied());
    let mut future_field = base_field.clone();
    let mut base_means = GasRates::new();
    let mut future_means = GasRates::new();

    for gas in gases {
        let bg = background.level(gas);
        base_field.series_mut(gas).fill(bg);
        base_means.insert(gas, bg);

        let b = base.simulated.get(gas);
        let f = future.simulated.get(gas);
        for (i, v) in future_field.series_mut(gas).iter_mut().enumerate() {
            let bi = b.map_or(0.0, |s| s[i]);
            let fi = f.map_or(0.0, |s| s[i]);
            *v = (bg + (fi - bi)).max(0.0);
        }

        let delta = rate_of(&future.simulated_means, gas) - rate_of(&base.simulated_means, gas);
        future_means.insert(gas, (bg + delta).max(0.0));
    }

    (base_field, future_field, base_means, future_means)
}
