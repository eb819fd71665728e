//! Aggregate totals → discrete point sources.

use crate::core_types::{gas_rates, EmissionSource, GasRates, Pollutant, SourceKind};
use crate::geometry::{LineString, Polygon};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Size class of an industrial parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndustryTier {
    /// Up to `medium_area_threshold`
    Small,
    /// Above `medium_area_threshold`, up to `large_area_threshold`
    Medium,
    /// Above `large_area_threshold`
    Large,
}

/// Per-tier stack emission rates (g/s) and the area thresholds (m²) between tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustryProfiles {
    /// Parcels strictly larger than this are at least medium
    pub medium_area_threshold: f64,
    /// Parcels strictly larger than this are large
    pub large_area_threshold: f64,
    /// Stack rates for small parcels (g/s)
    pub small: GasRates,
    /// Stack rates for medium parcels (g/s)
    pub medium: GasRates,
    /// Stack rates for large parcels (g/s)
    pub large: GasRates,
}

impl Default for IndustryProfiles {
    /// Rates moderated for mixed urban land use.
    fn default() -> Self {
        Self {
            medium_area_threshold: 5_000.0,
            large_area_threshold: 20_000.0,
            small: gas_rates([
                (Pollutant::Pm25, 0.05),
                (Pollutant::Pm10, 0.08),
                (Pollutant::Co, 0.5),
                (Pollutant::No2, 0.2),
                (Pollutant::So2, 0.1),
                (Pollutant::No, 0.05),
                (Pollutant::Nh3, 0.01),
                (Pollutant::O3, 0.0),
            ]),
            medium: gas_rates([
                (Pollutant::Pm25, 0.2),
                (Pollutant::Pm10, 0.35),
                (Pollutant::Co, 2.0),
                (Pollutant::No2, 1.0),
                (Pollutant::So2, 0.5),
                (Pollutant::No, 0.2),
                (Pollutant::Nh3, 0.05),
                (Pollutant::O3, 0.0),
            ]),
            large: gas_rates([
                (Pollutant::Pm25, 0.8),
                (Pollutant::Pm10, 1.5),
                (Pollutant::Co, 8.0),
                (Pollutant::No2, 4.0),
                (Pollutant::So2, 2.5),
                (Pollutant::No, 0.8),
                (Pollutant::Nh3, 0.2),
                (Pollutant::O3, 0.0),
            ]),
        }
    }
}

impl IndustryProfiles {
    /// Tier for a parcel of `area` m².
    #[must_use]
    pub fn classify(&self, area: f64) -> IndustryTier {
        if area > self.large_area_threshold {
            IndustryTier::Large
        } else if area > self.medium_area_threshold {
            IndustryTier::Medium
        } else {
            IndustryTier::Small
        }
    }

    /// Emission profile of a tier.
    #[must_use]
    pub fn profile(&self, tier: IndustryTier) -> &GasRates {
        match tier {
            IndustryTier::Small => &self.small,
            IndustryTier::Medium => &self.medium,
            IndustryTier::Large => &self.large,
        }
    }
}

/// Placement and release heights for each source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Distance between road sample points (m)
    pub road_spacing: f64,
    /// Release height of road sources (m)
    pub road_height: f64,
    /// Effective stack height of industrial sources (m)
    pub industry_height: f64,
    /// Release height of building sources (m)
    pub building_height: f64,
    /// Tier thresholds and stack profiles for industrial parcels
    pub industry: IndustryProfiles,
    /// Flat per-building profile; buildings are not pooled when `None`
    pub building_profile: Option<GasRates>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            road_spacing: 50.0,
            road_height: 1.5,
            industry_height: 30.0,
            building_height: 8.0,
            industry: IndustryProfiles::default(),
            building_profile: None,
        }
    }
}

/// Builds point sources from projected features.
#[derive(Debug, Clone, Copy)]
pub struct SourceApportioner<'a> {
    config: &'a SourceConfig,
}

impl<'a> SourceApportioner<'a> {
    /// Apportioner over a source configuration.
    #[must_use]
    pub fn new(config: &'a SourceConfig) -> Self {
        Self { config }
    }

    /// Spread network-wide `totals` (g/s) evenly over road sample points.
    ///
    /// Each line contributes points at `0, s, 2s, …` strictly short of
    /// `floor(len / s)·s`, each carrying `total / network_length · s` per gas.
    /// A network with zero or invalid total length yields no sources.
    #[must_use]
    pub fn road_sources(&self, roads: &[LineString], totals: &GasRates) -> Vec<EmissionSource> {
        let spacing = self.config.road_spacing;
        let total_length: f64 = roads.iter().map(LineString::length).sum();
        if !total_length.is_finite() || total_length <= 0.0 || spacing.is_nan() || spacing <= 0.0 {
            return Vec::new();
        }

        let per_point: GasRates = totals
            .iter()
            .map(|(&gas, &q)| (gas, q / total_length * spacing))
            .collect();

        let sources: Vec<EmissionSource> = roads
            .iter()
            .flat_map(|line| {
                let n = (line.length() / spacing).floor() as usize;
                (0..n).filter_map(move |i| line.interpolate(i as f64 * spacing))
            })
            .map(|p| {
                EmissionSource::new(SourceKind::Road, p, per_point.clone(), self.config.road_height)
            })
            .collect();

        debug!(
            "Roads: {} lines, {:.0} m total, {} points",
            roads.len(),
            total_length,
            sources.len()
        );
        sources
    }

    /// One stack per industrial parcel at its centroid, sized by area tier.
    #[must_use]
    pub fn industry_sources(&self, parcels: &[Polygon]) -> Vec<EmissionSource> {
        let profiles = &self.config.industry;
        parcels
            .iter()
            .filter_map(|parcel| {
                let centroid = parcel.centroid()?;
                let tier = profiles.classify(parcel.area());
                Some(EmissionSource::new(
                    SourceKind::Industry,
                    centroid,
                    profiles.profile(tier).clone(),
                    self.config.industry_height,
                ))
            })
            .collect()
    }

    /// One source per building centroid with a flat caller-supplied profile.
    #[must_use]
    pub fn building_sources(&self, buildings: &[Polygon], profile: &GasRates) -> Vec<EmissionSource> {
        buildings
            .iter()
            .filter_map(Polygon::centroid)
            .map(|c| {
                EmissionSource::new(
                    SourceKind::Building,
                    c,
                    profile.clone(),
                    self.config.building_height,
                )
            })
            .collect()
    }

    /// Building sources using the configured profile, if any.
    #[must_use]
    pub fn configured_building_sources(&self, buildings: &[Polygon]) -> Vec<EmissionSource> {
        match &self.config.building_profile {
            Some(profile) => self.building_sources(buildings, profile),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::rate_of;
    use crate::geometry::Point;
    use approx::assert_relative_eq;

    fn square(x: f64, y: f64, side: f64) -> Polygon {
        Polygon::from_coords(&[(x, y), (x + side, y), (x + side, y + side), (x, y + side)])
    }

    #[test]
    fn road_points_are_evenly_spaced() {
        let config = SourceConfig::default();
        let app = SourceApportioner::new(&config);
        let road = LineString::from_coords(&[(0.0, 0.0), (1000.0, 0.0)]);
        let sources = app.road_sources(&[road], &gas_rates([(Pollutant::Pm25, 1.0)]));

        assert_eq!(sources.len(), 20);
        for (i, s) in sources.iter().enumerate() {
            assert_relative_eq!(s.position.x, i as f64 * 50.0, epsilon = 1e-9);
            assert_relative_eq!(s.rate(Pollutant::Pm25), 0.05, epsilon = 1e-12);
            assert_eq!(s.height, 1.5);
            assert_eq!(s.kind, SourceKind::Road);
        }
    }

    #[test]
    fn road_rates_sum_to_totals_when_lengths_divide() {
        let config = SourceConfig::default();
        let app = SourceApportioner::new(&config);
        let roads = [
            LineString::from_coords(&[(0.0, 0.0), (400.0, 0.0)]),
            LineString::from_coords(&[(0.0, 100.0), (0.0, 250.0), (100.0, 250.0)]),
        ];
        let totals = gas_rates([(Pollutant::Co, 7.0), (Pollutant::No2, 0.9)]);
        let sources = app.road_sources(&roads, &totals);
        assert_eq!(sources.len(), 8 + 5);

        for (&gas, &total) in &totals {
            let sum: f64 = sources.iter().map(|s| s.rate(gas)).sum();
            assert_relative_eq!(sum, total, max_relative = 1e-12);
        }
    }

    #[test]
    fn short_or_empty_network() {
        let config = SourceConfig::default();
        let app = SourceApportioner::new(&config);
        let totals = gas_rates([(Pollutant::Pm10, 1.0)]);
        assert!(app.road_sources(&[], &totals).is_empty());

        let point_line = LineString::from_coords(&[(5.0, 5.0), (5.0, 5.0)]);
        assert!(app.road_sources(&[point_line], &totals).is_empty());

        // Shorter than one spacing: no sample points, but no panic either.
        let stub = LineString::from_coords(&[(0.0, 0.0), (30.0, 0.0)]);
        assert!(app.road_sources(&[stub], &totals).is_empty());
    }

    #[test]
    fn industry_tiers_follow_area() {
        let profiles = IndustryProfiles::default();
        assert_eq!(profiles.classify(5_000.0), IndustryTier::Small);
        assert_eq!(profiles.classify(5_000.1), IndustryTier::Medium);
        assert_eq!(profiles.classify(20_000.0), IndustryTier::Medium);
        assert_eq!(profiles.classify(20_001.0), IndustryTier::Large);

        let config = SourceConfig::default();
        let app = SourceApportioner::new(&config);
        let sources = app.industry_sources(&[square(0.0, 0.0, 50.0), square(1000.0, 0.0, 200.0)]);
        assert_eq!(sources.len(), 2);
        assert_relative_eq!(sources[0].position, Point::new(25.0, 25.0), epsilon = 1e-9);
        assert_eq!(sources[0].rate(Pollutant::So2), 0.1);
        assert_eq!(sources[1].rate(Pollutant::So2), 2.5);
        assert_eq!(sources[1].height, 30.0);
    }

    #[test]
    fn buildings_use_flat_profile() {
        let config = SourceConfig::default();
        let app = SourceApportioner::new(&config);
        let buildings = [square(0.0, 0.0, 10.0), square(40.0, 40.0, 20.0)];
        assert!(app.configured_building_sources(&buildings).is_empty());

        let profile = gas_rates([(Pollutant::Pm25, 0.002), (Pollutant::Co, 0.01)]);
        let sources = app.building_sources(&buildings, &profile);
        assert_eq!(sources.len(), 2);
        assert_relative_eq!(sources[1].position, Point::new(50.0, 50.0), epsilon = 1e-9);
        assert_eq!(rate_of(&sources[1].rates, Pollutant::Co), 0.01);
        assert_eq!(sources[1].height, 8.0);

        let with_profile = SourceConfig {
            building_profile: Some(profile),
            ..SourceConfig::default()
        };
        assert_eq!(
            SourceApportioner::new(&with_profile)
                .configured_building_sources(&buildings)
                .len(),
            2
        );
    }
}
