//! Temperature series for the dashboard
//!
//! OpenWeatherMap is used when an API key is configured, Open-Meteo otherwise
//! or when OpenWeatherMap fails. Weather is decoration: every failure ends in
//! `None` and never blocks the air-quality cycle.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, instrument, warn};

use crate::config::WeatherConfig;
use crate::http::HttpClient;
use crate::models::{Coordinates, WeatherSeries};
use crate::normalizer::time_label;

const OPENWEATHERMAP_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
const OPEN_METEO_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

pub struct WeatherService {
    http: Arc<dyn HttpClient>,
    openweathermap_key: Option<String>,
    hours: usize,
}

impl WeatherService {
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, openweathermap_key: Option<String>, hours: usize) -> Self {
        Self {
            http,
            openweathermap_key,
            hours,
        }
    }

    #[must_use]
    pub fn from_config(http: Arc<dyn HttpClient>, config: &WeatherConfig) -> Self {
        Self::new(
            http,
            config.openweathermap_api_key.clone(),
            config.forecast_hours as usize,
        )
    }

    /// Fetch the temperature series for the next hours
    #[instrument(skip(self))]
    pub async fn fetch_weather(
        &self,
        coords: Coordinates,
        fetched_at: DateTime<FixedOffset>,
    ) -> Option<WeatherSeries> {
        let start_time = Instant::now();

        if let Some(key) = self.openweathermap_key.as_deref() {
            match self.fetch_openweathermap(coords, key, fetched_at).await {
                Some(series) => {
                    info!(
                        "Weather from OpenWeatherMap: {} points in {:?}",
                        series.temperatures.len(),
                        start_time.elapsed()
                    );
                    return Some(series);
                }
                None => warn!("OpenWeatherMap weather unavailable, trying Open-Meteo"),
            }
        }

        let series = self.fetch_open_meteo(coords, fetched_at).await;
        match &series {
            Some(series) => info!(
                "Weather from Open-Meteo: {} points in {:?}",
                series.temperatures.len(),
                start_time.elapsed()
            ),
            None => warn!("No weather data available"),
        }
        series
    }

    async fn fetch_openweathermap(
        &self,
        coords: Coordinates,
        key: &str,
        fetched_at: DateTime<FixedOffset>,
    ) -> Option<WeatherSeries> {
        let url = format!(
            "{}?lat={}&lon={}&appid={}&units=metric&cnt={}",
            OPENWEATHERMAP_URL,
            coords.lat,
            coords.lon,
            urlencoding::encode(key),
            self.hours
        );

        let body = self
            .http
            .get_json(&url, &[])
            .await
            .map_err(|e| debug!("OpenWeatherMap request failed: {}", e))
            .ok()?;
        let response: openweathermap::ForecastResponse = serde_json::from_value(body)
            .map_err(|e| debug!("Failed to parse OpenWeatherMap forecast response: {}", e))
            .ok()?;

        response.into_series(self.hours, fetched_at)
    }

    async fn fetch_open_meteo(
        &self,
        coords: Coordinates,
        fetched_at: DateTime<FixedOffset>,
    ) -> Option<WeatherSeries> {
        let url = format!(
            "{}?latitude={}&longitude={}&hourly=temperature_2m,relativehumidity_2m&current_weather=true&timezone=auto",
            OPEN_METEO_FORECAST_URL, coords.lat, coords.lon
        );

        let body = self
            .http
            .get_json(&url, &[])
            .await
            .map_err(|e| debug!("Open-Meteo weather request failed: {}", e))
            .ok()?;
        let response: openmeteo::ForecastResponse = serde_json::from_value(body)
            .map_err(|e| debug!("Failed to parse OpenMeteo forecast response: {}", e))
            .ok()?;

        response.into_series(self.hours, fetched_at)
    }
}

/// OpenWeatherMap 5 day / 3 hour forecast structures
mod openweathermap {
    use super::{DateTime, FixedOffset, WeatherSeries};
    use chrono::Utc;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        #[serde(default)]
        pub list: Vec<Entry>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Entry {
        pub dt: i64,
        pub main: Main,
    }

    #[derive(Debug, Deserialize)]
    pub struct Main {
        pub temp: f64,
        pub humidity: Option<f64>,
    }

    impl ForecastResponse {
        pub fn into_series(
            self,
            hours: usize,
            fetched_at: DateTime<FixedOffset>,
        ) -> Option<WeatherSeries> {
            let entries: Vec<Entry> = self.list.into_iter().take(hours).collect();
            let first = entries.first()?;
            let current_temperature = Some(first.main.temp);
            let current_humidity = first.main.humidity;

            let time_labels = entries
                .iter()
                .map(|entry| {
                    DateTime::<Utc>::from_timestamp(entry.dt, 0)
                        .map_or(fetched_at, |at| at.with_timezone(fetched_at.offset()))
                        .format("%H:%M")
                        .to_string()
                })
                .collect();

            Some(WeatherSeries {
                time_labels,
                temperatures: entries.iter().map(|e| e.main.temp).collect(),
                current_temperature,
                current_humidity,
            })
        }
    }
}

/// `OpenMeteo` forecast response structures
mod openmeteo {
    use super::{DateTime, FixedOffset, WeatherSeries, time_label};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub hourly: Option<HourlyData>,
        pub current_weather: Option<CurrentWeather>,
    }

    #[derive(Debug, Deserialize)]
    pub struct HourlyData {
        pub time: Vec<String>,
        #[serde(rename = "temperature_2m")]
        pub temperature: Vec<Option<f64>>,
        #[serde(rename = "relativehumidity_2m", default)]
        pub humidity: Vec<Option<f64>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentWeather {
        pub temperature: Option<f64>,
    }

    impl ForecastResponse {
        pub fn into_series(
            self,
            hours: usize,
            fetched_at: DateTime<FixedOffset>,
        ) -> Option<WeatherSeries> {
            let hourly = self.hourly?;

            let (time_labels, temperatures): (Vec<String>, Vec<f64>) = hourly
                .time
                .iter()
                .zip(&hourly.temperature)
                .filter_map(|(time, temp)| {
                    temp.filter(|t| t.is_finite())
                        .map(|t| (time_label(time, fetched_at), t))
                })
                .take(hours)
                .unzip();

            if temperatures.is_empty() {
                return None;
            }

            let current_temperature = self
                .current_weather
                .and_then(|current| current.temperature)
                .or_else(|| temperatures.first().copied());
            let current_humidity = hourly.humidity.first().copied().flatten();

            Some(WeatherSeries {
                time_labels,
                temperatures,
                current_temperature,
                current_humidity,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpError;
    use crate::mock::MockHttpClient;
    use serde_json::json;

    fn create_test_coords() -> Coordinates {
        Coordinates::new(51.5074, -0.1278).unwrap()
    }

    fn create_test_time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00+00:00").unwrap()
    }

    fn create_open_meteo_body() -> serde_json::Value {
        json!({
            "current_weather": {"temperature": 9.4, "windspeed": 12.0},
            "hourly": {
                "time": ["2024-03-01T12:00", "2024-03-01T13:00", "2024-03-01T14:00"],
                "temperature_2m": [9.1, null, 10.2],
                "relativehumidity_2m": [81.0, 79.0, 76.0]
            }
        })
    }

    #[tokio::test]
    async fn test_open_meteo_without_key() {
        let mock = Arc::new(
            MockHttpClient::new().with_json("api.open-meteo.com", create_open_meteo_body()),
        );
        let service = WeatherService::new(mock.clone(), None, 24);

        let series = service
            .fetch_weather(create_test_coords(), create_test_time())
            .await
            .unwrap();

        assert_eq!(series.time_labels, vec!["12:00", "14:00"]);
        assert_eq!(series.temperatures, vec![9.1, 10.2]);
        assert_eq!(series.current_temperature, Some(9.4));
        assert_eq!(series.current_humidity, Some(81.0));
        assert_eq!(mock.call_count("openweathermap"), 0);
    }

    #[tokio::test]
    async fn test_openweathermap_preferred_with_key() {
        let mock = Arc::new(MockHttpClient::new().with_json(
            "api.openweathermap.org",
            json!({"cod": "200", "list": [
                {"dt": 1_709_294_400, "main": {"temp": 7.5, "humidity": 88.0}},
                {"dt": 1_709_305_200, "main": {"temp": 8.25, "humidity": 85.0}}
            ]}),
        ));
        let service = WeatherService::new(mock.clone(), Some("secret".into()), 24);

        let series = service
            .fetch_weather(create_test_coords(), create_test_time())
            .await
            .unwrap();

        assert_eq!(series.time_labels, vec!["12:00", "15:00"]);
        assert_eq!(series.current_temperature, Some(7.5));
        assert_eq!(series.current_humidity, Some(88.0));
        assert!(mock.urls()[0].contains("appid=secret&units=metric&cnt=24"));
    }

    #[tokio::test]
    async fn test_openweathermap_failure_falls_back() {
        let mock = Arc::new(
            MockHttpClient::new()
                .with_error(
                    "api.openweathermap.org",
                    HttpError::Status {
                        status: 401,
                        body: "Invalid API key".into(),
                    },
                )
                .with_json("api.open-meteo.com", create_open_meteo_body()),
        );
        let service = WeatherService::new(mock.clone(), Some("bad".into()), 24);

        let series = service
            .fetch_weather(create_test_coords(), create_test_time())
            .await;

        assert!(series.is_some());
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_hours_limit_and_total_failure() {
        let mock = Arc::new(
            MockHttpClient::new().with_json("api.open-meteo.com", create_open_meteo_body()),
        );
        let service = WeatherService::new(mock, None, 1);
        let series = service
            .fetch_weather(create_test_coords(), create_test_time())
            .await
            .unwrap();
        assert_eq!(series.temperatures.len(), 1);

        let failing = WeatherService::new(Arc::new(MockHttpClient::new()), None, 24);
        assert!(
            failing
                .fetch_weather(create_test_coords(), create_test_time())
                .await
                .is_none()
        );
    }
}
