//! Environmental oracle: sunlight and polar darkness by location.
//!
//! Outdoor tasks consult this for feasibility (no EVA at night outside
//! polar regions) and for the EVA safety interrupt.

use serde::{Deserialize, Serialize};

use crate::clock::MarsClock;

/// Surface position in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude: longitude.rem_euclid(360.0),
        }
    }
}

pub trait SurfaceFeatures: Send + Sync {
    /// Solar irradiance at the surface (W/m^2); 0 at night.
    fn solar_irradiance(&self, at: &Coordinates, clock: &MarsClock) -> f64;

    /// True inside a polar region during its dark season, where outdoor
    /// work continues without sunlight.
    fn in_dark_polar_region(&self, at: &Coordinates, clock: &MarsClock) -> bool;

    /// Ice collection is easier near the poles.
    fn in_polar_region(&self, at: &Coordinates) -> bool {
        at.latitude.abs() >= POLAR_LATITUDE
    }
}

/// Irradiance at the top of the atmosphere, attenuated to a typical clear-sky value.
const MEAN_IRRADIANCE: f64 = 590.0;
pub const POLAR_LATITUDE: f64 = 75.0;

/// Sun-angle model: noon at local millisol 500, with a fixed declination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarsSurface {
    /// Solar declination in degrees (positive: northern summer).
    pub declination: f64,
}

impl Default for MarsSurface {
    fn default() -> Self {
        Self { declination: 0.0 }
    }
}

impl MarsSurface {
    fn cos_zenith(&self, at: &Coordinates, clock: &MarsClock) -> f64 {
        let local = (clock.millisol_of_sol() / 1000.0 + at.longitude / 360.0).rem_euclid(1.0);
        let hour_angle = std::f64::consts::TAU * (local - 0.5);
        let lat = at.latitude.to_radians();
        let dec = self.declination.to_radians();
        lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.cos()
    }
}

impl SurfaceFeatures for MarsSurface {
    fn solar_irradiance(&self, at: &Coordinates, clock: &MarsClock) -> f64 {
        let cos_z = self.cos_zenith(at, clock);
        if cos_z <= 0.0 {
            0.0
        } else {
            MEAN_IRRADIANCE * cos_z
        }
    }

    fn in_dark_polar_region(&self, at: &Coordinates, clock: &MarsClock) -> bool {
        at.latitude.abs() >= POLAR_LATITUDE && self.solar_irradiance(at, clock) <= 0.0
    }
}

/// Constant conditions, for scenarios and tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedSurface {
    pub irradiance: f64,
    pub dark_polar: bool,
}

impl FixedSurface {
    pub fn daylight() -> Self {
        Self {
            irradiance: 500.0,
            dark_polar: false,
        }
    }

    pub fn night() -> Self {
        Self {
            irradiance: 0.0,
            dark_polar: false,
        }
    }
}

impl SurfaceFeatures for FixedSurface {
    fn solar_irradiance(&self, _at: &Coordinates, _clock: &MarsClock) -> f64 {
        self.irradiance
    }

    fn in_dark_polar_region(&self, _at: &Coordinates, _clock: &MarsClock) -> bool {
        self.dark_polar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noon_is_bright_midnight_dark() {
        let surface = MarsSurface::default();
        let equator = Coordinates::new(0.0, 0.0);
        let noon = MarsClock::new(500.0);
        let midnight = MarsClock::new(0.0);
        assert!((surface.solar_irradiance(&equator, &noon) - MEAN_IRRADIANCE).abs() < 1e-6);
        assert_eq!(surface.solar_irradiance(&equator, &midnight), 0.0);
        assert!(!surface.in_dark_polar_region(&equator, &midnight));
    }

    #[test]
    fn test_longitude_shifts_local_time() {
        let surface = MarsSurface::default();
        // 180 degrees east: local noon when the prime meridian is at midnight
        let far_side = Coordinates::new(0.0, 180.0);
        assert!(surface.solar_irradiance(&far_side, &MarsClock::new(0.0)) > 500.0);
    }

    #[test]
    fn test_polar_night() {
        let surface = MarsSurface { declination: 25.0 };
        let south_pole = Coordinates::new(-85.0, 0.0);
        let noon = MarsClock::new(500.0);
        assert_eq!(surface.solar_irradiance(&south_pole, &noon), 0.0);
        assert!(surface.in_dark_polar_region(&south_pole, &noon));
        assert!(surface.in_polar_region(&south_pole));
        assert!(!surface.in_polar_region(&Coordinates::new(40.0, 0.0)));
    }

    #[test]
    fn test_coordinates_normalised() {
        let c = Coordinates::new(120.0, -90.0);
        assert_eq!(c.latitude, 90.0);
        assert_eq!(c.longitude, 270.0);
    }
}
