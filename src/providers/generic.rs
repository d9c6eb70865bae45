//! Custom JSON air-quality feed
//!
//! Accepts the loosely-shaped payloads older dashboards consumed: values at
//! the top level or under `data`/`current`, several spellings per pollutant,
//! and an optional `forecast`/`list` array (including OpenWeatherMap's air
//! pollution shape). All key sniffing happens here; the rest of the pipeline
//! only sees [`GenericReading`].
//!
//! The configured URL may contain `{lat}`, `{lon}` and `{city}` placeholders.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{AirQualityProvider, FailureReason, ProviderFailure, first_number, number};
use crate::http::HttpClient;
use crate::models::{Coordinates, GenericReading, GenericSample, Provenance, RawReading};

const AQI_KEYS: [&str; 4] = ["aqi", "AQI", "air_quality_index", "index"];
const PM25_KEYS: [&str; 5] = ["pm25", "pm2_5", "PM25", "PM2_5", "pm25_concentration"];
const PM10_KEYS: [&str; 3] = ["pm10", "PM10", "pm10_concentration"];
const MAX_FORECAST_SAMPLES: usize = 24;

pub struct GenericProvider {
    http: Arc<dyn HttpClient>,
    url_template: String,
}

impl GenericProvider {
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, url_template: String) -> Self {
        Self { http, url_template }
    }

    fn build_url(&self, coords: Coordinates, city: Option<&str>) -> String {
        self.url_template
            .replace("{lat}", &coords.lat.to_string())
            .replace("{lon}", &coords.lon.to_string())
            .replace("{city}", &urlencoding::encode(city.unwrap_or_default()))
    }
}

#[async_trait]
impl AirQualityProvider for GenericProvider {
    fn provenance(&self) -> Provenance {
        Provenance::Generic
    }

    #[instrument(skip(self))]
    async fn fetch(
        &self,
        coords: Coordinates,
        city: Option<&str>,
    ) -> Result<RawReading, ProviderFailure> {
        let url = self.build_url(coords, city);
        let body = self
            .http
            .get_json(&url, &[])
            .await
            .map_err(|e| ProviderFailure::new(Provenance::Generic, e.into()))?;

        let data =
            parse_response(&body).map_err(|reason| ProviderFailure::new(Provenance::Generic, reason))?;
        debug!(
            "Generic feed: aqi={:?} pm25={:?} pm10={:?}, {} forecast samples",
            data.aqi,
            data.pm25,
            data.pm10,
            data.forecast_samples.len()
        );

        Ok(RawReading::Generic {
            provenance: Provenance::Generic,
            data,
        })
    }
}

fn parse_response(body: &Value) -> Result<GenericReading, FailureReason> {
    if !body.is_object() {
        return Err(FailureReason::invalid_payload("feed is not a JSON object"));
    }

    let current = ["data", "current"]
        .iter()
        .filter_map(|key| body.get(key))
        .find(|v| v.is_object())
        .unwrap_or(body);

    let forecast = forecast_entries(body);
    // OpenWeatherMap air pollution: `list[0]` is the current sample
    let owm_current = body
        .get("list")
        .and_then(Value::as_array)
        .and_then(|list| list.first());

    let mut reading = GenericReading {
        aqi: first_number(current, &AQI_KEYS)
            .or_else(|| owm_current.and_then(|c| c.pointer("/main/aqi")).and_then(number)),
        pm25: first_number(current, &PM25_KEYS).or_else(|| owm_current.and_then(owm_pm25)),
        pm10: first_number(current, &PM10_KEYS).or_else(|| owm_current.and_then(owm_pm10)),
        forecast_samples: Vec::new(),
    };

    reading.forecast_samples = forecast
        .iter()
        .take(MAX_FORECAST_SAMPLES)
        .map(|item| GenericSample {
            timestamp: item
                .get("dt")
                .or_else(|| item.get("timestamp"))
                .and_then(number)
                .map(|ts| ts as i64),
            pm25: first_number(item, &PM25_KEYS).or_else(|| owm_pm25(item)),
            pm10: first_number(item, &PM10_KEYS).or_else(|| owm_pm10(item)),
        })
        .collect();

    let has_values = reading.aqi.is_some() || reading.pm25.is_some() || reading.pm10.is_some();
    if !has_values && reading.forecast_samples.is_empty() {
        return Err(FailureReason::invalid_payload(
            "feed contains no recognised air quality fields",
        ));
    }
    Ok(reading)
}

/// `forecast`/`list` as an array, or the `hourly`/`daily` array inside it
fn forecast_entries(body: &Value) -> Vec<Value> {
    let Some(forecast) = body.get("forecast").or_else(|| body.get("list")) else {
        return Vec::new();
    };

    forecast
        .as_array()
        .or_else(|| forecast.get("hourly").and_then(Value::as_array))
        .or_else(|| forecast.get("daily").and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

fn owm_pm25(item: &Value) -> Option<f64> {
    item.pointer("/components/pm2_5").and_then(number)
}

fn owm_pm10(item: &Value) -> Option<f64> {
    item.pointer("/components/pm10").and_then(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHttpClient;
    use serde_json::json;

    #[test]
    fn test_parse_nested_data_aliases() {
        let body = json!({"status": "ok", "data": {"AQI": 120, "PM2_5": 44.0, "pm10_concentration": 80}});
        let reading = parse_response(&body).unwrap();
        assert_eq!(reading.aqi, Some(120.0));
        assert_eq!(reading.pm25, Some(44.0));
        assert_eq!(reading.pm10, Some(80.0));
        assert!(reading.forecast_samples.is_empty());
    }

    #[test]
    fn test_parse_forecast_list() {
        let body = json!({
            "aqi": 60,
            "forecast": {"hourly": [
                {"dt": 1_700_000_000, "pm25": 12.0, "pm10": 20.0},
                {"timestamp": 1_700_003_600, "pm2_5": 14.0},
                {"PM25": 9.0, "PM10": 11.0}
            ]}
        });
        let reading = parse_response(&body).unwrap();
        assert_eq!(reading.forecast_samples.len(), 3);
        assert_eq!(reading.forecast_samples[0].timestamp, Some(1_700_000_000));
        assert_eq!(reading.forecast_samples[1].pm10, None);
        assert_eq!(reading.forecast_samples[2].timestamp, None);
    }

    #[test]
    fn test_parse_openweathermap_shape() {
        let body = json!({
            "list": [
                {"dt": 1_700_000_000, "main": {"aqi": 2}, "components": {"pm2_5": 8.5, "pm10": 15.2}},
                {"dt": 1_700_003_600, "main": {"aqi": 3}, "components": {"pm2_5": 20.1, "pm10": 30.4}}
            ]
        });
        let reading = parse_response(&body).unwrap();
        assert_eq!(reading.aqi, Some(2.0));
        assert_eq!(reading.pm25, Some(8.5));
        assert_eq!(reading.forecast_samples.len(), 2);
        assert_eq!(reading.forecast_samples[1].pm10, Some(30.4));
    }

    #[test]
    fn test_parse_forecast_capped() {
        let items: Vec<Value> = (0..40).map(|i| json!({"pm25": i})).collect();
        let reading = parse_response(&json!({ "list": items })).unwrap();
        assert_eq!(reading.forecast_samples.len(), MAX_FORECAST_SAMPLES);
    }

    #[test]
    fn test_parse_rejects_unrecognised_feed() {
        assert!(parse_response(&json!({"temperature": 20})).is_err());
        assert!(parse_response(&json!([1, 2, 3])).is_err());
    }

    #[tokio::test]
    async fn test_url_placeholders() {
        let mock = Arc::new(MockHttpClient::new().with_json("feed.test", json!({"pm25": 5.0})));
        let provider = GenericProvider::new(
            mock.clone(),
            "https://feed.test/aq?lat={lat}&lon={lon}&q={city}".into(),
        );
        let coords = Coordinates::new(40.7128, -74.006).unwrap();
        provider.fetch(coords, Some("New York")).await.unwrap();
        assert_eq!(
            mock.urls()[0],
            "https://feed.test/aq?lat=40.7128&lon=-74.006&q=New%20York"
        );
    }
}
