//! Collaborators outside the dispersion core.
//!
//! Population, live background levels and geographic features come from
//! services the engine does not own. Each is a trait so callers can plug in
//! network clients, file readers or fixed values; the scenario pipeline calls
//! them on worker threads with a deadline and falls back when they fail.

pub mod metrics;

pub use metrics::{MetricsCache, MetricsKey, SiteMetrics, METRICS_CACHE_CAPACITY};

use crate::core_types::BackgroundLevels;
use crate::error::{PlumeError, PlumeResult};
use crate::geometry::{LineString, Polygon, UtmProjection};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Instant;

/// Resident population inside a site.
pub trait PopulationProvider: Send + Sync {
    /// Population of `site` (WGS84 lon/lat ring).
    fn population(&self, site: &Polygon) -> PlumeResult<f64>;
}

/// Current ambient concentrations near a site.
pub trait BackgroundProvider: Send + Sync {
    /// Background levels around `site` (WGS84 lon/lat ring), in µg/m³.
    fn background(&self, site: &Polygon) -> PlumeResult<BackgroundLevels>;
}

/// Urban features around a site.
pub trait FeatureProvider: Send + Sync {
    /// Features near `site` (projected ring), in the same projected metres.
    fn features(&self, site: &Polygon) -> PlumeResult<SiteFeatures>;
}

/// Roads, parcels and green cover in projected metres.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteFeatures {
    pub roads: Vec<LineString>,
    pub industry: Vec<Polygon>,
    pub buildings: Vec<Polygon>,
    pub green: Vec<Polygon>,
}

impl SiteFeatures {
    /// True when no feature of any kind is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roads.is_empty()
            && self.industry.is_empty()
            && self.buildings.is_empty()
            && self.green.is_empty()
    }

    /// Features that matter for `site` (a ring in the features' coordinates).
    ///
    /// Roads, industry and buildings are kept when they intersect the ring
    /// itself, so features in the empty corners of a non-rectangular site's
    /// bounding box are dropped. Green patches are kept when they come within
    /// `green_buffer` of the ring; their area is clipped later.
    #[must_use]
    pub fn near(&self, site: &Polygon, green_buffer: f64) -> SiteFeatures {
        let keep = |polygons: &[Polygon]| -> Vec<Polygon> {
            polygons
                .iter()
                .filter(|p| site.intersects(p))
                .cloned()
                .collect()
        };
        SiteFeatures {
            roads: self
                .roads
                .iter()
                .filter(|r| site.intersects_line(r))
                .cloned()
                .collect(),
            industry: keep(&self.industry),
            buildings: keep(&self.buildings),
            green: self
                .green
                .iter()
                .filter(|p| site.distance_to(p) <= green_buffer)
                .cloned()
                .collect(),
        }
    }

    /// Project features given in lon/lat degrees.
    #[must_use]
    pub fn project(&self, projection: &UtmProjection) -> SiteFeatures {
        let line = |l: &LineString| {
            LineString::new(
                l.points()
                    .iter()
                    .map(|p| projection.forward(p.x, p.y))
                    .collect(),
            )
        };
        SiteFeatures {
            roads: self.roads.iter().map(line).collect(),
            industry: self.industry.iter().map(|p| p.project(projection)).collect(),
            buildings: self.buildings.iter().map(|p| p.project(projection)).collect(),
            green: self.green.iter().map(|p| p.project(projection)).collect(),
        }
    }
}

/// Fixed population, e.g. from a census table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticPopulation(pub f64);

impl PopulationProvider for StaticPopulation {
    fn population(&self, _site: &Polygon) -> PlumeResult<f64> {
        Ok(self.0)
    }
}

/// Fixed background levels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticBackground(pub BackgroundLevels);

impl BackgroundProvider for StaticBackground {
    fn background(&self, _site: &Polygon) -> PlumeResult<BackgroundLevels> {
        Ok(self.0.clone())
    }
}

/// In-memory feature set, filtered to each site on request.
///
/// Green cover is returned whole; the pipeline applies its own buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticFeatures(pub SiteFeatures);

impl FeatureProvider for StaticFeatures {
    fn features(&self, site: &Polygon) -> PlumeResult<SiteFeatures> {
        Ok(self.0.near(site, f64::INFINITY))
    }
}

/// A lookup running on its own thread.
pub(crate) struct PendingCall<T> {
    service: &'static str,
    receiver: Option<Receiver<PlumeResult<T>>>,
    spawn_error: Option<String>,
}

impl<T: Send + 'static> PendingCall<T> {
    /// Start `call` on a named worker thread.
    pub(crate) fn spawn<F>(service: &'static str, call: F) -> Self
    where
        F: FnOnce() -> PlumeResult<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name(format!("{service}-lookup"))
            .spawn(move || {
                // Receiver may already have timed out.
                tx.send(call()).ok();
            });
        match spawned {
            Ok(_) => Self {
                service,
                receiver: Some(rx),
                spawn_error: None,
            },
            Err(e) => Self {
                service,
                receiver: None,
                spawn_error: Some(e.to_string()),
            },
        }
    }

    /// Wait until `deadline` for the result.
    ///
    /// A worker still running at the deadline is abandoned, not joined.
    pub(crate) fn wait_until(self, deadline: Instant) -> PlumeResult<T> {
        let Some(receiver) = self.receiver else {
            let reason = self.spawn_error.unwrap_or_default();
            return Err(PlumeError::external(self.service, reason));
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                Err(PlumeError::external(self.service, "timed out"))
            }
            Err(RecvTimeoutError::Disconnected) => Err(PlumeError::external(
                self.service,
                "worker stopped without a result",
            )),
        }
    }
}
