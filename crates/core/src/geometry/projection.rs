//! WGS84 → UTM forward projection.
//!
//! Transverse Mercator series from Snyder (1987), "Map Projections: A Working
//! Manual", USGS Professional Paper 1395, eqs. 8-9 to 8-13. Accuracy is
//! better than a millimetre within a zone, far below receptor spacing.

use super::Point;
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis (m).
const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// UTM central meridian scale factor.
const K0: f64 = 0.9996;

/// False easting applied to every zone (m).
const FALSE_EASTING: f64 = 500_000.0;

/// False northing for the southern hemisphere (m).
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A single UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmProjection {
    /// Zone number (1-60)
    pub zone: u8,
    /// Northern hemisphere zone
    pub north: bool,
}

impl Default for UtmProjection {
    /// Zone 43N (EPSG:32643), covering the reference sites.
    fn default() -> Self {
        Self {
            zone: 43,
            north: true,
        }
    }
}

impl UtmProjection {
    /// Zone containing the given longitude/latitude.
    #[must_use]
    pub fn for_lon_lat(lon: f64, lat: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i64).rem_euclid(60) + 1;
        Self {
            zone: zone as u8,
            north: lat >= 0.0,
        }
    }

    /// Longitude of the zone's central meridian (degrees).
    #[must_use]
    pub fn central_meridian(&self) -> f64 {
        f64::from(self.zone) * 6.0 - 183.0
    }

    /// Project `(lon, lat)` in degrees to `(easting, northing)` in metres.
    #[must_use]
    pub fn forward(&self, lon: f64, lat: f64) -> Point {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = (lon - self.central_meridian()).to_radians() * cos_phi;

        // Meridional arc length
        let m = WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let easting = K0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
            + FALSE_EASTING;

        let mut northing = K0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));
        if !self.north {
            northing += FALSE_NORTHING_SOUTH;
        }

        Point::new(easting, northing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn central_meridian_on_equator_is_false_origin() {
        let utm = UtmProjection::default();
        assert_relative_eq!(utm.central_meridian(), 75.0);
        let p = utm.forward(75.0, 0.0);
        assert_relative_eq!(p.x, 500_000.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn one_degree_of_latitude_near_equator() {
        let utm = UtmProjection::default();
        let p = utm.forward(75.0, 1.0);
        // Meridian arc for 1° at the equator is ~110,574 m, scaled by k0.
        assert_relative_eq!(p.y, 110_574.0 * K0, epsilon = 50.0);
    }

    #[test]
    fn zone_lookup() {
        let utm = UtmProjection::for_lon_lat(77.59, 12.97);
        assert_eq!(utm, UtmProjection::default());

        let south = UtmProjection::for_lon_lat(151.2, -33.9);
        assert_eq!(south.zone, 56);
        assert!(!south.north);
        assert!(south.forward(151.2, -33.9).y > 6_000_000.0);
    }

    #[test]
    fn small_site_keeps_metric_proportions() {
        // ~0.005° box in Bengaluru should be roughly 540 m x 550 m.
        let utm = UtmProjection::default();
        let sw = utm.forward(77.5700, 12.9150);
        let ne = utm.forward(77.5750, 12.9200);
        let width = ne.x - sw.x;
        let height = ne.y - sw.y;
        assert!((500.0..600.0).contains(&width), "width {width}");
        assert!((500.0..600.0).contains(&height), "height {height}");
    }
}
