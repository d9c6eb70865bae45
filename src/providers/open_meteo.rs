//! Open-Meteo air-quality API: primary reading and hourly forecast

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{AirQualityProvider, FailureReason, ProviderFailure};
use crate::http::HttpClient;
use crate::models::{
    Coordinates, ForecastPayload, HourlySeries, OpenMeteoCurrent, OpenMeteoReading, Provenance,
    RawReading,
};

const BASE_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";
const HOURLY_FIELDS: &str = "pm10,pm2_5,european_aqi,us_aqi";
const CURRENT_FIELDS: &str = "european_aqi,us_aqi,pm10,pm2_5";
const FORECAST_DAYS: u32 = 5;

/// Current conditions plus hourly series for a coordinate pair
pub struct OpenMeteoProvider {
    http: Arc<dyn HttpClient>,
}

impl OpenMeteoProvider {
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AirQualityProvider for OpenMeteoProvider {
    fn provenance(&self) -> Provenance {
        Provenance::OpenMeteo
    }

    #[instrument(skip(self, _city))]
    async fn fetch(
        &self,
        coords: Coordinates,
        _city: Option<&str>,
    ) -> Result<RawReading, ProviderFailure> {
        let url = format!(
            "{}?latitude={}&longitude={}&hourly={}&current={}&timezone=auto",
            BASE_URL, coords.lat, coords.lon, HOURLY_FIELDS, CURRENT_FIELDS
        );

        let body = self
            .http
            .get_json(&url, &[])
            .await
            .map_err(|e| ProviderFailure::new(Provenance::OpenMeteo, e.into()))?;

        let data = parse_reading(body)
            .map_err(|reason| ProviderFailure::new(Provenance::OpenMeteo, reason))?;
        debug!(
            "Open-Meteo reading: current={:?}, {} hourly entries",
            data.current,
            data.hourly.as_ref().map_or(0, |h| h.timestamps.len())
        );

        Ok(RawReading::OpenMeteo {
            provenance: Provenance::OpenMeteo,
            data,
        })
    }
}

/// Best-effort hourly pollutant forecast, fetched alongside the primary reading
pub struct OpenMeteoForecastClient {
    http: Arc<dyn HttpClient>,
}

impl OpenMeteoForecastClient {
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Fetch the forecast; any failure yields `None`
    #[instrument(skip(self))]
    pub async fn fetch_forecast(&self, coords: Coordinates) -> Option<ForecastPayload> {
        let url = format!(
            "{}?latitude={}&longitude={}&hourly={}&forecast_days={}&timezone=auto",
            BASE_URL, coords.lat, coords.lon, HOURLY_FIELDS, FORECAST_DAYS
        );

        let body = match self.http.get_json(&url, &[]).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Open-Meteo air quality forecast failed: {}", e);
                return None;
            }
        };

        match serde_json::from_value::<openmeteo::AirQualityResponse>(body) {
            Ok(response) => response
                .hourly
                .map(openmeteo::Hourly::into_series)
                .filter(|hourly| !hourly.timestamps.is_empty())
                .map(|hourly| ForecastPayload { hourly }),
            Err(e) => {
                warn!("Failed to parse Open-Meteo forecast response: {}", e);
                None
            }
        }
    }
}

/// `OpenMeteo` air-quality response structures
mod openmeteo {
    use serde::Deserialize;

    use crate::models::{HourlySeries, OpenMeteoCurrent};

    #[derive(Debug, Deserialize)]
    pub struct AirQualityResponse {
        pub current: Option<Current>,
        pub hourly: Option<Hourly>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Current {
        pub pm2_5: Option<f64>,
        pub pm10: Option<f64>,
        pub us_aqi: Option<f64>,
        pub european_aqi: Option<f64>,
    }

    /// Hourly columns; individual entries are `null` when the model has no value
    #[derive(Debug, Deserialize)]
    pub struct Hourly {
        #[serde(default)]
        pub time: Vec<String>,
        #[serde(default)]
        pub pm2_5: Vec<Option<f64>>,
        #[serde(default)]
        pub pm10: Vec<Option<f64>>,
    }

    impl From<Current> for OpenMeteoCurrent {
        fn from(current: Current) -> Self {
            Self {
                pm25: current.pm2_5,
                pm10: current.pm10,
                us_aqi: current.us_aqi,
                european_aqi: current.european_aqi,
            }
        }
    }

    impl Hourly {
        pub fn into_series(self) -> HourlySeries {
            HourlySeries {
                timestamps: self.time,
                pm25: self.pm2_5,
                pm10: self.pm10,
            }
        }
    }
}

fn parse_reading(body: Value) -> Result<OpenMeteoReading, FailureReason> {
    let response: openmeteo::AirQualityResponse = serde_json::from_value(body)
        .map_err(|e| FailureReason::invalid_payload(format!("unexpected Open-Meteo shape: {e}")))?;

    let current: OpenMeteoCurrent = response.current.map(Into::into).unwrap_or_default();
    let hourly: Option<HourlySeries> = response
        .hourly
        .map(openmeteo::Hourly::into_series)
        .filter(|hourly| !hourly.timestamps.is_empty());

    if current.is_empty() && hourly.is_none() {
        return Err(FailureReason::invalid_payload(
            "Open-Meteo response has no current or hourly data",
        ));
    }

    Ok(OpenMeteoReading { current, hourly })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpError;
    use crate::mock::MockHttpClient;
    use serde_json::json;

    fn create_test_coords() -> Coordinates {
        Coordinates::new(52.52, 13.41).unwrap()
    }

    fn create_test_response() -> Value {
        json!({
            "latitude": 52.5,
            "longitude": 13.4,
            "timezone": "Europe/Berlin",
            "current": {"time": "2024-03-01T10:00", "interval": 3600, "pm10": 18.2, "pm2_5": 11.3, "us_aqi": 47, "european_aqi": 28},
            "hourly": {
                "time": ["2024-03-01T00:00", "2024-03-01T01:00", "2024-03-01T02:00"],
                "pm10": [16.0, null, 17.5],
                "pm2_5": [10.1, 10.4, null],
                "us_aqi": [44, 45, 46],
                "european_aqi": [25, 26, 27]
            }
        })
    }

    #[test]
    fn test_parse_current_and_hourly() {
        let reading = parse_reading(create_test_response()).unwrap();
        assert_eq!(reading.current.pm25, Some(11.3));
        assert_eq!(reading.current.us_aqi, Some(47.0));
        let hourly = reading.hourly.unwrap();
        assert!(hourly.is_aligned());
        assert_eq!(hourly.pm10[1], None);
        assert_eq!(hourly.pm25[2], None);
    }

    #[test]
    fn test_parse_rejects_empty_response() {
        let result = parse_reading(json!({"latitude": 1.0, "longitude": 2.0}));
        assert!(matches!(result, Err(FailureReason::InvalidPayload { .. })));
    }

    #[tokio::test]
    async fn test_fetch_builds_query() {
        let mock = Arc::new(
            MockHttpClient::new().with_json("air-quality-api.open-meteo.com", create_test_response()),
        );
        let provider = OpenMeteoProvider::new(mock.clone());
        let reading = provider.fetch(create_test_coords(), None).await.unwrap();
        assert_eq!(reading.provenance(), Some(Provenance::OpenMeteo));
        assert!(reading.has_data());

        let url = &mock.urls()[0];
        assert!(url.starts_with("https://air-quality-api.open-meteo.com/v1/air-quality?"));
        assert!(url.contains("latitude=52.52&longitude=13.41"));
        assert!(url.contains("current=european_aqi,us_aqi,pm10,pm2_5"));
        assert!(url.ends_with("timezone=auto"));
    }

    #[tokio::test]
    async fn test_forecast_returns_hourly_payload() {
        let mock = Arc::new(
            MockHttpClient::new().with_json("air-quality-api.open-meteo.com", create_test_response()),
        );
        let client = OpenMeteoForecastClient::new(mock.clone());
        let forecast = client.fetch_forecast(create_test_coords()).await.unwrap();
        assert_eq!(forecast.hourly.timestamps.len(), 3);
        let url = &mock.urls()[0];
        assert!(url.starts_with("https://air-quality-api.open-meteo.com/v1/air-quality?"));
        assert!(url.contains("forecast_days=5"));
    }

    #[tokio::test]
    async fn test_forecast_failure_is_none() {
        let mock = Arc::new(
            MockHttpClient::new().with_error("air-quality-api.open-meteo.com", HttpError::Timeout),
        );
        let client = OpenMeteoForecastClient::new(mock);
        assert!(client.fetch_forecast(create_test_coords()).await.is_none());
    }
}
