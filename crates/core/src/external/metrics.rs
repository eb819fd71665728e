//! Site land-use metrics and their memoisation.

use super::SiteFeatures;
use crate::config::ScenarioConfig;
use crate::core_types::ScenarioParameters;
use crate::geometry::Polygon;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// Most recently used site polygons kept by [`MetricsCache`].
pub const METRICS_CACHE_CAPACITY: usize = 32;

/// Land-use summary of a projected site.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SiteMetrics {
    /// Site area (m²)
    pub area: f64,
    pub population: f64,
    pub building_count: usize,
    /// Assumed built footprint (m²)
    pub building_footprint: f64,
    pub industry_count: usize,
    /// Green cover inside the buffered site box (m²)
    pub green_area: f64,
}

impl SiteMetrics {
    /// Summarise a projected site and its features.
    ///
    /// Green patches are clipped to the site's bounding box grown by the
    /// configured buffer, and patches whose clipped area does not exceed the
    /// minimum patch size are dropped as digitising noise.
    #[must_use]
    pub fn compute(
        site: &Polygon,
        features: &SiteFeatures,
        population: f64,
        config: &ScenarioConfig,
    ) -> Self {
        let building_count = features.buildings.len();
        let green_area = site.bounds().map_or(0.0, |b| {
            let window = b.expanded(config.green_buffer);
            features
                .green
                .iter()
                .map(|patch| patch.clip_to_bounds(&window).area())
                .filter(|&a| a > config.min_green_patch)
                .sum()
        });

        Self {
            area: site.area(),
            population: if population.is_finite() {
                population.max(0.0)
            } else {
                0.0
            },
            building_count,
            building_footprint: building_count as f64 * config.building_footprint,
            industry_count: features.industry.len(),
            green_area,
        }
    }

    /// Present-day parameters implied by the site's own land use.
    ///
    /// Built and green fractions are footprint / area and green / area,
    /// clamped to `[0, 1]`; growth and horizon are zero.
    #[must_use]
    pub fn baseline_parameters(&self) -> ScenarioParameters {
        let fraction = |part: f64| {
            if self.area > 0.0 {
                (part / self.area).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };
        ScenarioParameters::current(fraction(self.building_footprint), fraction(self.green_area))
    }
}

/// Identity of the inputs behind one [`SiteMetrics`] value: the exact site
/// ring plus a fingerprint of the population and features it was built from.
///
/// Two lookups of the same polygon through different providers therefore
/// never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricsKey {
    site: Vec<u64>,
    inputs: u64,
}

impl MetricsKey {
    #[must_use]
    pub fn new(site: &Polygon, features: &SiteFeatures, population: f64) -> Self {
        let mut hasher = FxHasher::default();
        population.to_bits().hash(&mut hasher);
        features.roads.len().hash(&mut hasher);
        for road in &features.roads {
            road.points().len().hash(&mut hasher);
            for p in road.points() {
                p.x.to_bits().hash(&mut hasher);
                p.y.to_bits().hash(&mut hasher);
            }
        }
        for group in [&features.industry, &features.buildings, &features.green] {
            group.len().hash(&mut hasher);
            for polygon in group {
                polygon.key_bits().hash(&mut hasher);
            }
        }
        Self {
            site: site.key_bits(),
            inputs: hasher.finish(),
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: FxHashMap<MetricsKey, (SiteMetrics, u64)>,
    clock: u64,
}

/// Bounded least-recently-used cache of [`SiteMetrics`] keyed by [`MetricsKey`].
#[derive(Debug)]
pub struct MetricsCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new(METRICS_CACHE_CAPACITY)
    }
}

impl MetricsCache {
    /// Cache holding at most `capacity` sites (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Number of cached sites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached metrics for `key`, marking them as recently used.
    #[must_use]
    pub fn get(&self, key: &MetricsKey) -> Option<SiteMetrics> {
        let mut state = self.lock();
        state.clock += 1;
        let now = state.clock;
        state.entries.get_mut(key).map(|(metrics, used)| {
            *used = now;
            *metrics
        })
    }

    /// Store metrics for `key`, evicting the least recently used entry when full.
    pub fn insert(&self, key: MetricsKey, metrics: SiteMetrics) {
        let mut state = self.lock();
        state.clock += 1;
        let now = state.clock;
        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, (_, used))| *used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }
        state.entries.insert(key, (metrics, now));
    }

    /// Cached metrics, or compute and store them.
    ///
    /// `compute` runs without the lock held, so concurrent misses on the same
    /// key may both compute; the last one stored wins.
    pub fn get_or_insert_with<F>(&self, key: MetricsKey, compute: F) -> SiteMetrics
    where
        F: FnOnce() -> SiteMetrics,
    {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let metrics = compute();
        self.insert(key, metrics);
        metrics
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // The state holds only plain data, so a poisoned lock is still usable.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
