//! Data models for the `CityDash` dashboard
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and resolved city metadata
//! - Air quality: Provider readings, forecast payloads and the canonical series
//! - Weather: Canonical temperature series consumed by the dashboard

pub mod air_quality;
pub mod location;
pub mod weather;

// Re-export all public types for convenient access
pub use air_quality::{
    AirQualitySeries, ApiNinjasReading, AqicnReading, ForecastPayload, GenericReading,
    GenericSample, HourlySeries, OpenAqSample, OpenMeteoCurrent, OpenMeteoReading, Pollutant,
    Provenance, RawReading,
};
pub use location::{Coordinates, Location};
pub use weather::WeatherSeries;
