//! AQICN (World Air Quality Index) station feeds
//!
//! The same feed endpoint is queried either by city name or by `geo:lat;lon`.
//! Both forms share one parser and differ only in their provenance tag.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{AirQualityProvider, FailureReason, ProviderFailure, require_city};
use crate::http::HttpClient;
use crate::models::{AqicnReading, Coordinates, Provenance, RawReading};

const BASE_URL: &str = "https://api.waqi.info/feed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    City,
    Geo,
}

pub struct AqicnProvider {
    http: Arc<dyn HttpClient>,
    token: String,
    lookup: Lookup,
}

impl AqicnProvider {
    /// Feed for a city name
    #[must_use]
    pub fn by_city(http: Arc<dyn HttpClient>, token: String) -> Self {
        Self {
            http,
            token,
            lookup: Lookup::City,
        }
    }

    /// Feed for the nearest station to a coordinate pair
    #[must_use]
    pub fn by_coordinates(http: Arc<dyn HttpClient>, token: String) -> Self {
        Self {
            http,
            token,
            lookup: Lookup::Geo,
        }
    }

    fn build_url(&self, coords: Coordinates, city: Option<&str>) -> Result<String, ProviderFailure> {
        let station = match self.lookup {
            Lookup::City => urlencoding::encode(require_city(self.provenance(), city)?).into_owned(),
            Lookup::Geo => format!("geo:{};{}", coords.lat, coords.lon),
        };
        Ok(format!(
            "{}/{}/?token={}",
            BASE_URL,
            station,
            urlencoding::encode(&self.token)
        ))
    }
}

#[async_trait]
impl AirQualityProvider for AqicnProvider {
    fn provenance(&self) -> Provenance {
        match self.lookup {
            Lookup::City => Provenance::AqicnCity,
            Lookup::Geo => Provenance::AqicnGeo,
        }
    }

    #[instrument(skip(self), fields(provider = %self.provenance()))]
    async fn fetch(
        &self,
        coords: Coordinates,
        city: Option<&str>,
    ) -> Result<RawReading, ProviderFailure> {
        let provenance = self.provenance();
        let url = self.build_url(coords, city)?;

        let body = self
            .http
            .get_json(&url, &[])
            .await
            .map_err(|e| ProviderFailure::new(provenance, e.into()))?;

        let data = parse_response(body).map_err(|reason| ProviderFailure::new(provenance, reason))?;
        debug!(
            "AQICN reading: aqi={:?} pm25={:?} pm10={:?}",
            data.aqi, data.pm25, data.pm10
        );

        Ok(RawReading::Aqicn { provenance, data })
    }
}

/// AQICN response structures
mod waqi {
    use serde::Deserialize;
    use serde_json::Value;

    #[derive(Debug, Deserialize)]
    pub struct FeedData {
        /// Number, or `"-"` when the station has no current index
        pub aqi: Option<Value>,
        pub iaqi: Option<Iaqi>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Iaqi {
        pub pm25: Option<IaqiValue>,
        pub pm10: Option<IaqiValue>,
    }

    #[derive(Debug, Deserialize)]
    pub struct IaqiValue {
        pub v: Option<f64>,
    }
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    status: String,
    data: Option<Value>,
}

fn parse_response(body: Value) -> Result<AqicnReading, FailureReason> {
    let response: FeedResponse = serde_json::from_value(body)
        .map_err(|e| FailureReason::invalid_payload(format!("unexpected AQICN shape: {e}")))?;

    if response.status != "ok" {
        let detail = response
            .data
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(FailureReason::invalid_payload(format!(
            "AQICN status '{}': {detail}",
            response.status
        )));
    }

    let data: waqi::FeedData = response
        .data
        .ok_or_else(|| FailureReason::invalid_payload("AQICN response without data"))
        .and_then(|data| {
            serde_json::from_value(data)
                .map_err(|e| FailureReason::invalid_payload(format!("unexpected AQICN data: {e}")))
        })?;

    let iaqi = data.iaqi.as_ref();
    let value = |entry: Option<&waqi::IaqiValue>| entry.and_then(|e| e.v).filter(|v| v.is_finite());

    let reading = AqicnReading {
        aqi: data.aqi.as_ref().and_then(super::number),
        pm25: value(iaqi.and_then(|i| i.pm25.as_ref())),
        pm10: value(iaqi.and_then(|i| i.pm10.as_ref())),
    };

    if reading.aqi.is_none() && reading.pm25.is_none() && reading.pm10.is_none() {
        return Err(FailureReason::NoData);
    }
    Ok(reading)
}
