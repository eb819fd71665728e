//! Emission inventories: traffic totals and their placement as point sources.

pub mod apportion;
pub mod vehicle;

pub use apportion::{IndustryProfiles, IndustryTier, SourceApportioner, SourceConfig};
pub use vehicle::{TravelMode, VehicleEmissionEstimator, VehicleEmissionModel};
