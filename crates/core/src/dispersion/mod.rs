//! Atmospheric dispersion: spread parameters, single plumes, superposition
//! and urban corrections.

pub mod aggregator;
pub mod plume;
pub mod stability;
pub mod urban;

pub use aggregator::{DispersionAggregator, RoughnessConfig};
pub use plume::{PlumeConfig, PlumeCoordinates, PlumeEvaluator, PlumeFrame};
pub use stability::{StabilityClass, StabilityModel, StabilityTable, Sigmas};
pub use urban::{UrbanConfig, UrbanModifier};
