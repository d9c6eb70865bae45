//! `CityDash` - smart-city air quality dashboard
//!
//! This library resolves a city, pulls air-quality readings through a chain of
//! fallback providers, normalizes them into one hourly series, scores them on
//! the US EPA AQI scale and combines them with weather, simulated traffic and
//! energy load into dashboard snapshots.

pub mod aqi;
pub mod config;
pub mod error;
pub mod fallback;
pub mod geocoding;
pub mod http;
pub mod insights;
pub mod mock;
pub mod models;
pub mod normalizer;
pub mod providers;
pub mod scheduler;
pub mod session;
pub mod synthetic;
pub mod telemetry;
pub mod weather;

// Re-export core types for public API
pub use aqi::{AqiLabel, AqiResult, resolve_aqi, us_aqi_from_concentration};
pub use config::DashboardConfig;
pub use error::DashboardError;
pub use fallback::{FallbackOrchestrator, FetchOutcome};
pub use geocoding::{Geocoder, LocationResolver};
pub use http::{HttpClient, HttpError, ReqwestHttpClient};
pub use models::{AirQualitySeries, Coordinates, Location, Provenance, RawReading, WeatherSeries};
pub use normalizer::normalize;
pub use providers::{AirQualityProvider, FailureReason, ProviderFailure};
pub use scheduler::{SessionController, SessionEvent};
pub use session::{DashboardSession, DashboardSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
