//! OpenAQ measurements near a coordinate pair
//!
//! Final link of the chain. Errors are never propagated: any failure turns into
//! an empty sample set, which the orchestrator treats as "no data".

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{AirQualityProvider, ProviderFailure};
use crate::http::HttpClient;
use crate::models::{Coordinates, OpenAqSample, Pollutant, Provenance, RawReading};

const BASE_URL: &str = "https://api.openaq.org/v2/measurements";
const LIMIT: u32 = 50;
const RADIUS_METERS: u32 = 10_000;

pub struct OpenAqProvider {
    http: Arc<dyn HttpClient>,
    api_key: Option<String>,
}

impl OpenAqProvider {
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl AirQualityProvider for OpenAqProvider {
    fn provenance(&self) -> Provenance {
        Provenance::OpenAq
    }

    #[instrument(skip(self, _city))]
    async fn fetch(
        &self,
        coords: Coordinates,
        _city: Option<&str>,
    ) -> Result<RawReading, ProviderFailure> {
        let url = format!(
            "{}?coordinates={},{}&limit={}&sort=desc&radius={}",
            BASE_URL, coords.lat, coords.lon, LIMIT, RADIUS_METERS
        );

        let headers: Vec<(&str, &str)> = self
            .api_key
            .as_deref()
            .map(|key| vec![("X-API-Key", key)])
            .unwrap_or_default();

        let samples = match self.http.get_json(&url, &headers).await {
            Ok(body) => parse_samples(body),
            Err(e) => {
                warn!("OpenAQ fetch failed, using empty result set: {}", e);
                Vec::new()
            }
        };
        info!("OpenAQ returned {} PM samples", samples.len());

        Ok(RawReading::OpenAqSeries {
            provenance: Provenance::OpenAq,
            samples,
        })
    }
}

/// OpenAQ v2 measurement entry
#[derive(Debug, Deserialize)]
struct Measurement {
    parameter: String,
    value: f64,
    date: MeasurementDate,
}

#[derive(Debug, Deserialize)]
struct MeasurementDate {
    utc: String,
}

/// Keep PM2.5/PM10 measurements in response order (newest first)
fn parse_samples(body: Value) -> Vec<OpenAqSample> {
    let Some(results) = body.get("results").and_then(Value::as_array) else {
        warn!("OpenAQ response without results array");
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|entry| serde_json::from_value::<Measurement>(entry.clone()).ok())
        .filter_map(|m| {
            let parameter = Pollutant::from_parameter(&m.parameter)?;
            m.value.is_finite().then_some(OpenAqSample {
                parameter,
                value: m.value,
                timestamp_utc: m.date.utc,
            })
        })
        .collect()
}
