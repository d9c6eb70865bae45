//! Air-quality provider adapters
//!
//! Each adapter calls one vendor endpoint and parses that vendor's response
//! shape into a single [`RawReading`] variant. Adapters never panic or
//! propagate transport errors: everything becomes a [`ProviderFailure`] the
//! fallback chain can step over.

pub mod api_ninjas;
pub mod aqicn;
pub mod generic;
pub mod open_meteo;
pub mod openaq;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::ProvidersConfig;
use crate::http::{HttpClient, HttpError};
use crate::models::{Coordinates, Provenance, RawReading};

pub use api_ninjas::ApiNinjasProvider;
pub use aqicn::AqicnProvider;
pub use generic::GenericProvider;
pub use open_meteo::{OpenMeteoForecastClient, OpenMeteoProvider};
pub use openaq::OpenAqProvider;

/// Why a provider could not deliver a reading
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FailureReason {
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("timed out")]
    Timeout,

    #[error("invalid payload: {message}")]
    InvalidPayload { message: String },

    #[error("no usable pollutant data")]
    NoData,

    #[error("no city name available")]
    MissingCity,
}

impl FailureReason {
    pub fn invalid_payload<S: Into<String>>(message: S) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }
}

impl From<HttpError> for FailureReason {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Transport { message } => Self::Transport { message },
            HttpError::Timeout => Self::Timeout,
            HttpError::Status { status, .. } => Self::Status { status },
            HttpError::Decode { message } => Self::InvalidPayload { message },
        }
    }
}

/// A provider attempt that did not yield a usable reading
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{provenance} failed: {reason}")]
pub struct ProviderFailure {
    pub provenance: Provenance,
    pub reason: FailureReason,
}

impl ProviderFailure {
    #[must_use]
    pub fn new(provenance: Provenance, reason: FailureReason) -> Self {
        Self { provenance, reason }
    }
}

/// One air-quality data source in the fallback chain
#[async_trait]
pub trait AirQualityProvider: Send + Sync {
    /// Tag attached to readings from this provider
    fn provenance(&self) -> Provenance;

    /// Fetch and parse a reading.
    ///
    /// `city` is `None` when only coordinates are known; city-based
    /// providers then fail with [`FailureReason::MissingCity`].
    async fn fetch(
        &self,
        coords: Coordinates,
        city: Option<&str>,
    ) -> Result<RawReading, ProviderFailure>;
}

/// Build the provider chain in priority order.
///
/// API-Ninjas, AQICN by city, AQICN by coordinates, Open-Meteo, the optional
/// generic feed, then OpenAQ.
#[must_use]
pub fn default_chain(
    config: &ProvidersConfig,
    http: Arc<dyn HttpClient>,
) -> Vec<Arc<dyn AirQualityProvider>> {
    let mut chain: Vec<Arc<dyn AirQualityProvider>> = vec![
        Arc::new(ApiNinjasProvider::new(
            Arc::clone(&http),
            config.api_ninjas_key.clone(),
        )),
        Arc::new(AqicnProvider::by_city(
            Arc::clone(&http),
            config.aqicn_token.clone(),
        )),
        Arc::new(AqicnProvider::by_coordinates(
            Arc::clone(&http),
            config.aqicn_token.clone(),
        )),
        Arc::new(OpenMeteoProvider::new(Arc::clone(&http))),
    ];

    if let Some(url) = &config.generic_url {
        chain.push(Arc::new(GenericProvider::new(Arc::clone(&http), url.clone())));
    }

    chain.push(Arc::new(OpenAqProvider::new(
        http,
        config.openaq_api_key.clone(),
    )));
    chain
}

/// Read a finite number from a JSON number or numeric string
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// First key of `keys` present on `object` with a numeric value
pub(crate) fn first_number(object: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| object.get(key).and_then(number))
}

/// Non-empty trimmed city name
pub(crate) fn require_city(
    provenance: Provenance,
    city: Option<&str>,
) -> Result<&str, ProviderFailure> {
    city.map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ProviderFailure::new(provenance, FailureReason::MissingCity))
}
