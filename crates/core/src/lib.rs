//! Urban Plume Core Library
//!
//! Ground-level pollutant concentrations from distributed urban sources
//! (traffic, industry, buildings) under a single static wind, and comparison
//! of a current land-use scenario against a future one.
//!
//! ## Pipeline
//!
//! - Site polygon repair and UTM projection
//! - Traffic totals from population, apportioned to road sample points;
//!   industrial stacks tiered by parcel area
//! - Pasquill-Gifford spread and Gaussian plume per source, superposed over a
//!   regular receptor grid with a roughness-adjusted wind
//! - Street-canyon trapping and vegetation deposition corrections
//! - Background levels, scenario comparison and AQI estimator inputs
//!
//! Dispersion is CPU-bound and parallelised with rayon; lookups of
//! population, background and features run on worker threads with deadlines
//! and fall back to configured defaults.

// Core types and utilities
pub mod config;
pub mod core_types;
pub mod error;
pub mod geometry;
pub mod receptors;

// Physics
pub mod dispersion;
pub mod emissions;

// Wiring and outputs
pub mod aqi;
pub mod external;
pub mod scenario;

// Re-export core types
pub use config::{DispersionConfig, ScenarioConfig};
pub use core_types::{
    BackgroundLevels, ConcentrationField, EmissionSource, GasRates, Pollutant, ScenarioParameters,
    SourceCounts, SourceKind, Wind,
};
pub use error::{PlumeError, PlumeResult};
pub use geometry::{Bounds, LineString, Point, Polygon, UtmProjection};
pub use receptors::{ReceptorGrid, DEFAULT_MAX_RECEPTORS};

// Re-export physics types
pub use dispersion::{
    DispersionAggregator, PlumeConfig, PlumeEvaluator, RoughnessConfig, StabilityClass,
    StabilityModel, UrbanConfig, UrbanModifier,
};
pub use emissions::{SourceApportioner, SourceConfig, VehicleEmissionEstimator, VehicleEmissionModel};

// Re-export scenario types
pub use aqi::{AqiAssessment, AqiEstimator, AqiFeatures, AqiStatus, ConstantAqi};
pub use external::{
    BackgroundProvider, FeatureProvider, MetricsCache, MetricsKey, PopulationProvider,
    SiteFeatures, SiteMetrics,
};
pub use scenario::{
    ComparisonMode, ScenarioComparator, ScenarioComparison, ScenarioComposer, ScenarioOutcome,
    Services, SiteContext,
};
