//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

use crate::{DashboardError, Result};

/// Validated geographic coordinates
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees, within [-90, 90]
    pub lat: f64,
    /// Longitude in decimal degrees, within [-180, 180]
    pub lon: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting values outside the valid ranges
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(DashboardError::validation(format!(
                "latitude {lat} is outside [-90, 90]"
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(DashboardError::validation(format!(
                "longitude {lon} is outside [-180, 180]"
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Format as a coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// A resolved city: coordinates plus the name shown on the dashboard
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    pub coordinates: Coordinates,
    /// Location name (city, region, etc.)
    pub name: String,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(coordinates: Coordinates, name: String) -> Self {
        Self { coordinates, name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_accept_valid_range() {
        let coords = Coordinates::new(28.6139, 77.209).unwrap();
        assert_eq!(coords.lat, 28.6139);
        assert_eq!(coords.lon, 77.209);
        assert!(Coordinates::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_coordinates_reject_out_of_range() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_format_coordinates() {
        let coords = Coordinates::new(51.507_351, -0.127_758).unwrap();
        assert_eq!(coords.format_coordinates(), "51.5074, -0.1278");
    }
}
