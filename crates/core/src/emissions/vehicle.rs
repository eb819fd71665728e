//! Daily traffic emissions from resident population.

use crate::core_types::{gas_rates, gas_union, rate_of, GasRates, Pollutant};
use serde::{Deserialize, Serialize};

/// One way of travelling and its per-kilometre emission factors (g/km).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelMode {
    /// Label used in logs and configuration files
    pub name: String,
    /// Fraction of all trips made in this mode
    pub share: f64,
    /// Persons per vehicle
    pub occupancy: f64,
    /// Mean distance per vehicle trip (km)
    pub avg_km: f64,
    /// Emission factor per vehicle-kilometre for each gas (g/km)
    pub factors: GasRates,
}

impl TravelMode {
    /// Motorised two-wheeler.
    #[must_use]
    pub fn two_wheeler() -> Self {
        Self {
            name: "two_wheeler".to_string(),
            share: 0.35,
            occupancy: 1.1,
            avg_km: 8.0,
            factors: gas_rates([
                (Pollutant::Pm25, 0.015),
                (Pollutant::Pm10, 0.02),
                (Pollutant::Co, 1.5),
                (Pollutant::No2, 0.15),
                (Pollutant::So2, 0.01),
                (Pollutant::No, 0.05),
                (Pollutant::Nh3, 0.001),
                (Pollutant::O3, 0.0),
            ]),
        }
    }

    /// Private car.
    #[must_use]
    pub fn car() -> Self {
        Self {
            name: "car".to_string(),
            share: 0.25,
            occupancy: 1.5,
            avg_km: 12.0,
            factors: gas_rates([
                (Pollutant::Pm25, 0.035),
                (Pollutant::Pm10, 0.05),
                (Pollutant::Co, 2.5),
                (Pollutant::No2, 0.45),
                (Pollutant::So2, 0.02),
                (Pollutant::No, 0.1),
                (Pollutant::Nh3, 0.002),
                (Pollutant::O3, 0.0),
            ]),
        }
    }

    /// Vehicle-kilometres travelled per day for `trips` person-trips.
    #[must_use]
    pub fn vehicle_km(&self, trips: f64) -> f64 {
        if self.occupancy <= 0.0 {
            return 0.0;
        }
        trips * self.share / self.occupancy * self.avg_km
    }
}

/// Constants of the population → traffic emission model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleEmissionModel {
    /// Daily person-trips per resident
    pub trips_per_person: f64,
    /// Resuspended road dust multiplier for particulates
    pub road_dust_factor: f64,
    /// Divisor turning daily mass into a rate (s)
    pub seconds_per_day: f64,
    /// Travel modes whose emissions are summed
    pub modes: Vec<TravelMode>,
}

impl Default for VehicleEmissionModel {
    fn default() -> Self {
        Self {
            trips_per_person: 3.5,
            road_dust_factor: 8.5,
            seconds_per_day: 86_400.0,
            modes: vec![TravelMode::two_wheeler(), TravelMode::car()],
        }
    }
}

/// Turns a population count into network-wide emission totals (g/s per gas).
#[derive(Debug, Clone, Copy)]
pub struct VehicleEmissionEstimator<'a> {
    model: &'a VehicleEmissionModel,
}

impl<'a> VehicleEmissionEstimator<'a> {
    /// Estimator over a set of model constants.
    #[must_use]
    pub fn new(model: &'a VehicleEmissionModel) -> Self {
        Self { model }
    }

    /// Total traffic emissions for `population` residents.
    ///
    /// Every gas listed by any mode appears in the result. Negative or
    /// non-finite populations count as nobody.
    #[must_use]
    pub fn estimate(&self, population: f64) -> GasRates {
        let population = if population.is_finite() {
            population.max(0.0)
        } else {
            0.0
        };
        let trips = population * self.model.trips_per_person;
        let vkt: Vec<f64> = self
            .model
            .modes
            .iter()
            .map(|mode| mode.vehicle_km(trips))
            .collect();

        gas_union(self.model.modes.iter().map(|m| &m.factors))
            .into_iter()
            .map(|gas| {
                let mut grams: f64 = self
                    .model
                    .modes
                    .iter()
                    .zip(&vkt)
                    .map(|(mode, km)| km * rate_of(&mode.factors, gas))
                    .sum();
                if gas.is_particulate() {
                    grams *= self.model.road_dust_factor;
                }
                (gas, grams / self.model.seconds_per_day)
            })
            .collect()
    }
}
