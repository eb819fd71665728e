//! Discrete point sources fed to the dispersion aggregator.

use super::pollutant::{rate_of, GasRates, Pollutant};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Which kind of urban feature a point source was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Interpolated point along a road centreline
    Road,
    /// Stack at an industrial parcel centroid
    Industry,
    /// Building centroid (domestic combustion, generators)
    Building,
}

/// Point emission source in projected metres.
///
/// Rebuilt for every scenario evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionSource {
    /// Origin feature type
    pub kind: SourceKind,

    /// Projected position (m)
    pub position: Point,

    /// Per-gas emission rate (g/s); absent gases emit nothing
    pub rates: GasRates,

    /// Effective release height above ground (m)
    pub height: f64,
}

impl EmissionSource {
    /// Create a point source.
    #[must_use]
    pub fn new(kind: SourceKind, position: Point, rates: GasRates, height: f64) -> Self {
        Self {
            kind,
            position,
            rates,
            height,
        }
    }

    /// Emission rate for `gas`, zero when the source does not emit it.
    #[inline]
    #[must_use]
    pub fn rate(&self, gas: Pollutant) -> f64 {
        rate_of(&self.rates, gas)
    }
}

/// Number of sources of each kind, reported alongside scenario results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    /// Road points
    pub roads: usize,
    /// Industrial stacks
    pub industry: usize,
    /// Building centroids
    pub buildings: usize,
}

impl SourceCounts {
    /// Tally a pooled source list.
    #[must_use]
    pub fn tally(sources: &[EmissionSource]) -> Self {
        sources
            .iter()
            .fold(SourceCounts::default(), |mut counts, source| {
                match source.kind {
                    SourceKind::Road => counts.roads += 1,
                    SourceKind::Industry => counts.industry += 1,
                    SourceKind::Building => counts.buildings += 1,
                }
                counts
            })
    }

    /// Total across kinds.
    #[must_use]
    pub fn total(&self) -> usize {
        self.roads + self.industry + self.buildings
    }
}
