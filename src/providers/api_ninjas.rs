//! API-Ninjas air quality by city name

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{AirQualityProvider, FailureReason, ProviderFailure, require_city};
use crate::http::HttpClient;
use crate::models::{ApiNinjasReading, Coordinates, Provenance, RawReading};

const BASE_URL: &str = "https://api.api-ninjas.com/v1/airquality";

pub struct ApiNinjasProvider {
    http: Arc<dyn HttpClient>,
    api_key: Option<String>,
}

impl ApiNinjasProvider {
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl AirQualityProvider for ApiNinjasProvider {
    fn provenance(&self) -> Provenance {
        Provenance::ApiNinjas
    }

    #[instrument(skip(self, _coords))]
    async fn fetch(
        &self,
        _coords: Coordinates,
        city: Option<&str>,
    ) -> Result<RawReading, ProviderFailure> {
        let city = require_city(Provenance::ApiNinjas, city)?;
        let url = format!("{}?city={}", BASE_URL, urlencoding::encode(city));

        let headers: Vec<(&str, &str)> = self
            .api_key
            .as_deref()
            .map(|key| vec![("X-Api-Key", key)])
            .unwrap_or_default();

        let body = self
            .http
            .get_json(&url, &headers)
            .await
            .map_err(|e| ProviderFailure::new(Provenance::ApiNinjas, e.into()))?;

        let data = parse_response(&body)
            .map_err(|reason| ProviderFailure::new(Provenance::ApiNinjas, reason))?;
        debug!(
            "API-Ninjas reading for {}: aqi={:?} pm25={:?} pm10={:?}",
            city, data.overall_aqi, data.pm25_concentration, data.pm10_concentration
        );

        Ok(RawReading::ApiNinjas {
            provenance: Provenance::ApiNinjas,
            data,
        })
    }
}

/// Parse `{overall_aqi, "PM2.5"|"PM2_5": {concentration, aqi}, PM10: {..}}`
fn parse_response(body: &Value) -> Result<ApiNinjasReading, FailureReason> {
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        return Err(FailureReason::invalid_payload(message));
    }

    let pm25 = body.get("PM2.5").or_else(|| body.get("PM2_5"));
    let pm10 = body.get("PM10");
    let overall = body.get("overall_aqi").and_then(super::number);

    if overall.is_none() && pm25.is_none() && pm10.is_none() {
        return Err(FailureReason::invalid_payload(
            "response has neither overall_aqi nor PM2.5/PM10 entries",
        ));
    }

    let field = |entry: Option<&Value>, key: &str| {
        entry
            .and_then(|e| e.get(key))
            .and_then(super::number)
    };

    Ok(ApiNinjasReading {
        overall_aqi: overall
            .or_else(|| field(pm25, "aqi"))
            .or_else(|| field(pm10, "aqi")),
        pm25_concentration: field(pm25, "concentration"),
        pm10_concentration: field(pm10, "concentration"),
    })
}
