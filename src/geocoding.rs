//! Location Resolution Module
//!
//! Resolves a city name into coordinates and a display name. Nominatim is
//! queried first; the Open-Meteo geocoding API is used when Nominatim fails or
//! finds nothing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::http::HttpClient;
use crate::models::{Coordinates, Location};
use crate::{DashboardError, Result};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const OPEN_METEO_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

/// City name to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `city`, failing with [`DashboardError::Geocode`] when it is unknown
    async fn geocode(&self, city: &str) -> Result<Location>;
}

/// Service for resolving city names
pub struct LocationResolver {
    http: Arc<dyn HttpClient>,
}

impl LocationResolver {
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    async fn resolve_nominatim(&self, city: &str) -> Result<Option<Location>> {
        let url = format!(
            "{}?format=json&q={}&limit=1",
            NOMINATIM_URL,
            urlencoding::encode(city)
        );
        let body = self
            .http
            .get_json(&url, &[])
            .await
            .map_err(|e| DashboardError::api(format!("Nominatim request failed: {e}")))?;

        let places: Vec<nominatim::Place> = serde_json::from_value(body)
            .map_err(|e| DashboardError::api(format!("Failed to parse Nominatim response: {e}")))?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        let (Ok(lat), Ok(lon)) = (place.lat.parse::<f64>(), place.lon.parse::<f64>()) else {
            return Err(DashboardError::api(format!(
                "Nominatim returned invalid coordinates: {}, {}",
                place.lat, place.lon
            )));
        };

        let name = place
            .display_name
            .split(',')
            .next()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(city)
            .to_string();

        Ok(Some(Location::new(Coordinates::new(lat, lon)?, name)))
    }

    async fn resolve_open_meteo(&self, city: &str) -> Result<Option<Location>> {
        let url = format!(
            "{}?name={}&count=1&language=en&format=json",
            OPEN_METEO_GEOCODING_URL,
            urlencoding::encode(city)
        );
        let body = self
            .http
            .get_json(&url, &[])
            .await
            .map_err(|e| DashboardError::api(format!("Open-Meteo geocoding failed: {e}")))?;

        let response: openmeteo::GeocodingResponse = serde_json::from_value(body).map_err(|e| {
            DashboardError::api(format!("Failed to parse OpenMeteo geocoding response: {e}"))
        })?;

        response
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|result| {
                Coordinates::new(result.latitude, result.longitude)
                    .map(|coords| Location::new(coords, result.name))
            })
            .transpose()
    }
}

#[async_trait]
impl Geocoder for LocationResolver {
    #[instrument(skip(self))]
    async fn geocode(&self, city: &str) -> Result<Location> {
        let city = city.trim();
        if city.is_empty() {
            return Err(DashboardError::validation("city name cannot be empty"));
        }

        match self.resolve_nominatim(city).await {
            Ok(Some(location)) => {
                debug!(
                    "Found location: {} ({})",
                    location.name,
                    location.coordinates.format_coordinates()
                );
                return Ok(location);
            }
            Ok(None) => debug!("Nominatim found no match for {}", city),
            Err(e) => warn!("Nominatim geocoding failed, trying Open-Meteo: {}", e),
        }

        match self.resolve_open_meteo(city).await {
            Ok(Some(location)) => {
                debug!(
                    "Found location via Open-Meteo: {} ({})",
                    location.name,
                    location.coordinates.format_coordinates()
                );
                Ok(location)
            }
            Ok(None) => Err(DashboardError::geocode(city)),
            Err(e) => {
                warn!("Open-Meteo geocoding failed: {}", e);
                Err(DashboardError::geocode(city))
            }
        }
    }
}

/// Nominatim search response structures
mod nominatim {
    use serde::Deserialize;

    /// Coordinates arrive as decimal strings
    #[derive(Debug, Deserialize)]
    pub struct Place {
        pub lat: String,
        pub lon: String,
        #[serde(default)]
        pub display_name: String,
    }
}

/// `OpenMeteo` geocoding response structures
mod openmeteo {
    use super::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResponse {
        pub results: Option<Vec<GeocodingResult>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResult {
        pub name: String,
        pub latitude: f64,
        pub longitude: f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpError;
    use crate::mock::MockHttpClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_nominatim_first_component_is_name() {
        let mock = Arc::new(MockHttpClient::new().with_json(
            "nominatim.openstreetmap.org",
            json!([{"lat": "28.6138954", "lon": "77.2090057", "display_name": "Delhi, India"}]),
        ));
        let resolver = LocationResolver::new(mock.clone());
        let location = resolver.geocode(" Delhi ").await.unwrap();

        assert_eq!(location.name, "Delhi");
        assert!((location.coordinates.lat - 28.6139).abs() < 1e-3);
        assert_eq!(
            mock.urls(),
            vec!["https://nominatim.openstreetmap.org/search?format=json&q=Delhi&limit=1"]
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_open_meteo() {
        let mock = Arc::new(
            MockHttpClient::new()
                .with_error("nominatim", HttpError::Timeout)
                .with_json(
                    "geocoding-api.open-meteo.com",
                    json!({"results": [{"name": "London", "latitude": 51.50853, "longitude": -0.12574, "country": "United Kingdom"}]}),
                ),
        );
        let resolver = LocationResolver::new(mock.clone());
        let location = resolver.geocode("London").await.unwrap();
        assert_eq!(location.name, "London");
        assert_eq!(mock.call_count("geocoding-api"), 1);
    }

    #[tokio::test]
    async fn test_unknown_city_is_geocode_error() {
        let mock = Arc::new(
            MockHttpClient::new()
                .with_json("nominatim", json!([]))
                .with_json("geocoding-api", json!({"generationtime_ms": 0.5})),
        );
        let resolver = LocationResolver::new(mock);
        let err = resolver.geocode("Atlantis").await.unwrap_err();
        assert!(matches!(err, DashboardError::Geocode { ref city } if city == "Atlantis"));
    }

    #[tokio::test]
    async fn test_empty_city_is_rejected() {
        let resolver = LocationResolver::new(Arc::new(MockHttpClient::new()));
        let err = resolver.geocode("   ").await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation { .. }));
    }
}
