//! Stability-dependent plume spread (sigma_y, sigma_z).
//!
//! Piecewise power-law fits to the Pasquill-Gifford dispersion curves:
//!
//! ```text
//! sigma_z = a · (x/1000)^b                      capped at 5000 m
//! theta   = k1 · (c − d · ln(|x + ε| / 1000))   degrees → radians
//! sigma_y = k2 · (x/1000) · tan(theta)
//! ```
//!
//! with k1 = 0.017453293 (deg→rad), k2 = 465.11628 and ε = 1e-15 so that
//! x = 0 never reaches `ln(0)`. The (a, b) pair changes with downwind
//! distance inside each class; (c, d) are fixed per class.
//!
//! The bin fits are not exactly continuous at their edges: adjacent bins
//! disagree by up to ~1e-4 relative, so sigma_z is non-decreasing in
//! distance only to that tolerance.
//!
//! # References
//!
//! - Turner, D.B. (1970). "Workbook of Atmospheric Dispersion Estimates."
//! - U.S. EPA (1995). "User's Guide for the ISC3 Dispersion Models", Vol. II, Tables 1-1 and 1-2.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Degrees → radians factor used by the crosswind fit.
const K1: f64 = 0.017453293;

/// Crosswind fit scale (m).
const K2: f64 = 465.11628;

/// Keeps the log argument positive at x = 0.
const LOG_EPSILON: f64 = 1e-15;

/// Vertical spread never exceeds a typical mixing height (m).
const MAX_SIGMA_Z: f64 = 5000.0;

/// Pasquill-Gifford stability class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StabilityClass {
    /// A - very unstable
    VeryUnstable = 1,
    /// B - moderately unstable
    ModeratelyUnstable = 2,
    /// C - slightly unstable
    SlightlyUnstable = 3,
    /// D - neutral
    Neutral = 4,
    /// E - moderately stable
    ModeratelyStable = 5,
    /// F - very stable
    VeryStable = 6,
}

impl StabilityClass {
    /// All classes from most to least turbulent.
    pub const ALL: [StabilityClass; 6] = [
        StabilityClass::VeryUnstable,
        StabilityClass::ModeratelyUnstable,
        StabilityClass::SlightlyUnstable,
        StabilityClass::Neutral,
        StabilityClass::ModeratelyStable,
        StabilityClass::VeryStable,
    ];

    /// Class for a 1-based index, `None` outside 1..=6.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index).checked_sub(1)?).copied()
    }

    /// Class for a 1-based index; anything unrecognised is treated as neutral.
    #[must_use]
    pub fn from_index_or_neutral(index: u8) -> Self {
        Self::from_index(index).unwrap_or(StabilityClass::Neutral)
    }

    /// 1-based index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }
}

/// One distance bin of the vertical spread fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmaZBin {
    /// Exclusive upper bound of the bin (m); `None` for the open last bin
    pub upper: Option<f64>,
    /// Coefficient a
    pub a: f64,
    /// Exponent b
    pub b: f64,
}

impl SigmaZBin {
    const fn to(upper: f64, a: f64, b: f64) -> Self {
        Self {
            upper: Some(upper),
            a,
            b,
        }
    }

    const fn beyond(a: f64, b: f64) -> Self {
        Self { upper: None, a, b }
    }
}

/// Fitted curves for one stability class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCurve {
    /// Contiguous distance bins in increasing order
    pub bins: Vec<SigmaZBin>,
    /// Crosswind intercept c (degrees)
    pub c: f64,
    /// Crosswind log slope d (degrees)
    pub d: f64,
}

impl ClassCurve {
    fn coefficients(&self, x: f64) -> (f64, f64) {
        self.bins
            .iter()
            .find(|bin| bin.upper.is_none_or(|upper| x < upper))
            .or(self.bins.last())
            .map_or((0.0, 0.0), |bin| (bin.a, bin.b))
    }
}

/// Complete table of class curves, classes 1 to 6 in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityTable {
    /// Curves indexed by class − 1
    pub classes: Vec<ClassCurve>,
}

impl Default for StabilityTable {
    fn default() -> Self {
        let bins = |b: &[SigmaZBin]| b.to_vec();
        Self {
            classes: vec![
                ClassCurve {
                    bins: bins(&[
                        SigmaZBin::to(100.0, 122.800, 0.94470),
                        SigmaZBin::to(150.0, 158.080, 1.05420),
                        SigmaZBin::to(200.0, 170.220, 1.09320),
                        SigmaZBin::to(250.0, 179.520, 1.12620),
                        SigmaZBin::to(300.0, 217.410, 1.26440),
                        SigmaZBin::to(400.0, 258.89, 1.40940),
                        SigmaZBin::to(500.0, 346.75, 1.7283),
                        SigmaZBin::beyond(453.85, 2.1166),
                    ]),
                    c: 24.1670,
                    d: 2.5334,
                },
                ClassCurve {
                    bins: bins(&[
                        SigmaZBin::to(200.0, 90.673, 0.93198),
                        SigmaZBin::to(400.0, 98.483, 0.98332),
                        SigmaZBin::beyond(109.3, 1.09710),
                    ]),
                    c: 18.3330,
                    d: 1.8096,
                },
                ClassCurve {
                    bins: bins(&[SigmaZBin::beyond(61.141, 0.91465)]),
                    c: 12.5,
                    d: 1.0857,
                },
                ClassCurve {
                    bins: bins(&[
                        SigmaZBin::to(300.0, 34.459, 0.86974),
                        SigmaZBin::to(1000.0, 32.093, 0.81066),
                        SigmaZBin::to(3000.0, 32.093, 0.64403),
                        SigmaZBin::to(10000.0, 33.504, 0.60486),
                        SigmaZBin::to(30000.0, 36.650, 0.56589),
                        SigmaZBin::beyond(44.053, 0.51179),
                    ]),
                    c: 8.3330,
                    d: 0.72382,
                },
                ClassCurve {
                    bins: bins(&[
                        SigmaZBin::to(100.0, 24.26, 0.83660),
                        SigmaZBin::to(300.0, 23.331, 0.81956),
                        SigmaZBin::to(1000.0, 21.628, 0.75660),
                        SigmaZBin::to(2000.0, 21.628, 0.63077),
                        SigmaZBin::to(4000.0, 22.534, 0.57154),
                        SigmaZBin::to(10000.0, 24.703, 0.50527),
                        SigmaZBin::to(20000.0, 26.970, 0.46713),
                        SigmaZBin::to(40000.0, 35.420, 0.37615),
                        SigmaZBin::beyond(47.618, 0.29592),
                    ]),
                    c: 6.25,
                    d: 0.54287,
                },
                ClassCurve {
                    bins: bins(&[
                        SigmaZBin::to(200.0, 15.209, 0.81558),
                        SigmaZBin::to(700.0, 14.457, 0.78407),
                        SigmaZBin::to(1000.0, 13.953, 0.68465),
                        SigmaZBin::to(2000.0, 13.953, 0.63227),
                        SigmaZBin::to(3000.0, 14.823, 0.54503),
                        SigmaZBin::to(7000.0, 16.187, 0.46490),
                        SigmaZBin::to(15000.0, 17.836, 0.41507),
                        SigmaZBin::to(30000.0, 22.651, 0.32681),
                        SigmaZBin::to(60000.0, 27.074, 0.27436),
                        SigmaZBin::beyond(34.219, 0.21716),
                    ]),
                    c: 4.1667,
                    d: 0.36191,
                },
            ],
        }
    }
}

/// Horizontal and vertical spread at one distance (m).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sigmas {
    /// Crosswind spread sigma_y
    pub y: f64,
    /// Vertical spread sigma_z
    pub z: f64,
}

/// Spread coefficient model backed by an injected [`StabilityTable`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StabilityModel {
    table: StabilityTable,
}

impl StabilityModel {
    /// Model over a specific table.
    #[must_use]
    pub fn new(table: StabilityTable) -> Self {
        Self { table }
    }

    /// Underlying table.
    #[must_use]
    pub fn table(&self) -> &StabilityTable {
        &self.table
    }

    fn curve(&self, class: StabilityClass) -> Option<&ClassCurve> {
        self.table
            .classes
            .get(usize::from(class.index()) - 1)
            .or_else(|| {
                self.table
                    .classes
                    .get(usize::from(StabilityClass::Neutral.index()) - 1)
            })
    }

    /// Spread at one downwind distance; the sign of `distance` is ignored.
    ///
    /// Both outputs are finite for every finite input (non-finite
    /// intermediate results are mapped to 0). Callers floor them before
    /// dividing.
    #[must_use]
    pub fn sigmas(&self, class: StabilityClass, distance: f64) -> Sigmas {
        let Some(curve) = self.curve(class) else {
            return Sigmas { y: 0.0, z: 0.0 };
        };
        let x = distance.abs();
        if !x.is_finite() {
            return Sigmas {
                y: 0.0,
                z: MAX_SIGMA_Z,
            };
        }

        let z = if x > 0.0 {
            let (a, b) = curve.coefficients(x);
            (a * (x / 1000.0).powf(b)).min(MAX_SIGMA_Z)
        } else {
            0.0
        };

        let theta = K1 * (curve.c - curve.d * ((x + LOG_EPSILON) / 1000.0).ln());
        let y = K2 * (x / 1000.0) * theta.tan();

        Sigmas {
            y: finite_or_zero(y),
            z: finite_or_zero(z),
        }
    }

    /// Spread for a slice of distances, evaluated in parallel.
    #[must_use]
    pub fn sigmas_many(&self, class: StabilityClass, distances: &[f64]) -> Vec<Sigmas> {
        distances
            .par_iter()
            .map(|&x| self.sigmas(class, x))
            .collect()
    }
}

#[inline]
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
