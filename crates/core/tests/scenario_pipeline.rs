//! Scenario Pipeline Test Suite
//!
//! End-to-end runs of site preparation, scenario evaluation and comparison,
//! including collaborators that fail or never answer.
//!
//! Run tests with: cargo test --test `scenario_pipeline`

use std::sync::Arc;
use std::time::Duration;

use urban_plume_core::{
    core_types::gas_rates, AqiAssessment, AqiEstimator, AqiStatus, BackgroundLevels,
    BackgroundProvider, ComparisonMode, ConstantAqi, DispersionConfig, FeatureProvider,
    LineString, PlumeError, PlumeResult, Pollutant, Polygon, PopulationProvider,
    ScenarioComparator, ScenarioComposer, ScenarioParameters, Services, SiteFeatures, Wind,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Jayanagar block, Bengaluru (WGS84).
fn site() -> Polygon {
    Polygon::from_coords(&[
        (77.5700, 12.9150),
        (77.5750, 12.9150),
        (77.5750, 12.9200),
        (77.5700, 12.9200),
        (77.5700, 12.9150),
    ])
}

fn wind() -> Wind {
    Wind::new(3.2, 240.0)
}

fn projected_roads(config: &DispersionConfig) -> SiteFeatures {
    let p = config.scenario.projection;
    let a = p.forward(77.5700, 12.9175);
    let b = p.forward(77.5750, 12.9175);
    let c = p.forward(77.5725, 12.9150);
    let d = p.forward(77.5725, 12.9200);
    SiteFeatures {
        roads: vec![
            LineString::from_coords(&[(a.x, a.y), (b.x, b.y)]),
            LineString::from_coords(&[(c.x, c.y), (d.x, d.y)]),
        ],
        ..SiteFeatures::default()
    }
}

struct Unreachable;

impl PopulationProvider for Unreachable {
    fn population(&self, _: &Polygon) -> PlumeResult<f64> {
        Err(PlumeError::external("population", "connection refused"))
    }
}

impl BackgroundProvider for Unreachable {
    fn background(&self, _: &Polygon) -> PlumeResult<BackgroundLevels> {
        Err(PlumeError::external("background", "HTTP 503"))
    }
}

impl FeatureProvider for Unreachable {
    fn features(&self, _: &Polygon) -> PlumeResult<SiteFeatures> {
        Err(PlumeError::external("features", "file not found"))
    }
}

struct Sleepy(Duration);

impl PopulationProvider for Sleepy {
    fn population(&self, _: &Polygon) -> PlumeResult<f64> {
        std::thread::sleep(self.0);
        Ok(1_000_000.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEST 1: Fallbacks
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_failed_services_fall_back_with_warnings() {
    init_tracing();
    let composer = ScenarioComposer::default();
    let services = Services::new(
        Arc::new(Unreachable),
        Arc::new(Unreachable),
        Arc::new(Unreachable),
    );
    let ctx = composer.prepare(&site(), None, &services).unwrap();

    assert_eq!(ctx.warnings.len(), 3, "{:?}", ctx.warnings);
    assert_eq!(ctx.background, BackgroundLevels::fallback());
    assert_eq!(ctx.population, 0.0);
    assert!(ctx.features.is_empty());

    let out = composer.evaluate(&ctx, &ScenarioParameters::current(0.4, 0.2), &wind());
    assert_eq!(out.means, *BackgroundLevels::fallback().as_rates());
    assert_eq!(out.warnings, ctx.warnings);
}

#[test]
fn test_slow_population_times_out() {
    init_tracing();
    let mut config = DispersionConfig::default();
    config.scenario.io_timeout_ms = 50;
    config.scenario.fallback_population = 1234.0;
    let composer = ScenarioComposer::new(config);

    let services = Services {
        population: Arc::new(Sleepy(Duration::from_secs(2))),
        ..Services::default()
    };
    let started = std::time::Instant::now();
    let ctx = composer.prepare(&site(), None, &services).unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(ctx.population, 1234.0);
    assert!(ctx.warnings.iter().any(|w| w.contains("population")));
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEST 2: Comparison
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_delta_anchored_identity() {
    init_tracing();
    let config = DispersionConfig::default();
    let services = Services::in_memory(
        45_000.0,
        BackgroundLevels::fallback(),
        projected_roads(&config),
    );
    let composer = ScenarioComposer::new(config);
    let comparator = ScenarioComparator::new(&composer, ComparisonMode::DeltaAnchored);

    let params = ScenarioParameters::new(0.35, 0.25, 0.02, 10.0);
    let cmp = comparator
        .run(&site(), &params, &params, &wind(), None, &services)
        .unwrap();

    assert!(cmp.base.source_counts.roads > 0);
    for (gas, level) in cmp.background.as_rates() {
        assert_eq!(cmp.future_means[gas], *level, "{gas}");
    }
}

#[test]
fn test_future_with_more_people_is_worse() {
    init_tracing();
    let config = DispersionConfig::default();
    let services = Services::in_memory(
        45_000.0,
        BackgroundLevels::fallback(),
        projected_roads(&config),
    );
    let composer = ScenarioComposer::new(config);

    for mode in [ComparisonMode::Absolute, ComparisonMode::DeltaAnchored] {
        let comparator = ScenarioComparator::new(&composer, mode);
        let cmp = comparator
            .run(
                &site(),
                &ScenarioParameters::current(0.4, 0.2),
                &ScenarioParameters::new(0.4, 0.2, 0.03, 15.0),
                &wind(),
                None,
                &services,
            )
            .unwrap();
        let change = cmp.mean_changes();
        for gas in [Pollutant::Pm25, Pollutant::Pm10, Pollutant::Co, Pollutant::No2] {
            assert!(change[&gas] > 0.0, "{mode:?} {gas}");
        }
        assert_eq!(change[&Pollutant::O3], 0.0);
    }
}

#[test]
fn test_aqi_assessment_from_comparison() {
    init_tracing();
    let composer = ScenarioComposer::default();
    let comparator = ScenarioComparator::new(&composer, ComparisonMode::default());
    let background = BackgroundLevels::new(gas_rates([
        (Pollutant::Pm25, 40.0),
        (Pollutant::No, 2.0),
        (Pollutant::No2, 8.0),
        (Pollutant::Co, 500.0),
    ]));
    let params = ScenarioParameters::current(0.3, 0.3);
    let cmp = comparator
        .run(&site(), &params, &params, &wind(), Some(background), &Services::default())
        .unwrap();

    let features = cmp.future_aqi_features();
    assert_eq!(features.pm2_5, 40.0);
    assert_eq!(features.nox, 10.0);
    assert_eq!(features.co, 0.5);

    let estimators: Vec<Box<dyn AqiEstimator>> = vec![
        Box::new(ConstantAqi::new("random_forest", 90.0)),
        Box::new(ConstantAqi::new("gradient_boosting", 120.0)),
    ];
    let aqi = AqiAssessment::assess(&estimators, &features, "Bengaluru").unwrap();
    assert_eq!(aqi.average, 105.0);
    assert_eq!(aqi.status, AqiStatus::Moderate);
}
