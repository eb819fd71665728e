//! Scenario evaluation and comparison.

pub mod comparator;
pub mod composer;

pub use comparator::{ComparisonMode, ScenarioComparator, ScenarioComparison};
pub use composer::{ScenarioComposer, ScenarioOutcome, Services, SiteContext};
