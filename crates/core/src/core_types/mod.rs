//! Core value types shared by every stage of the pipeline.

pub mod field;
pub mod pollutant;
pub mod scenario;
pub mod source;
pub mod wind;

pub use field::ConcentrationField;
pub use pollutant::{gas_rates, gas_union, rate_of, GasRates, Pollutant};
pub use scenario::{BackgroundLevels, ScenarioParameters};
pub use source::{EmissionSource, SourceCounts, SourceKind};
pub use wind::Wind;
