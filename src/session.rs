//! One dashboard refresh cycle
//!
//! Fetches the primary reading, the pollutant forecast and the weather series
//! concurrently, then normalizes, scores and describes them as a
//! [`DashboardSnapshot`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Local, Timelike};
use serde::Serialize;
use tracing::{info, instrument};

use crate::aqi::{AqiResult, resolve_aqi};
use crate::config::DashboardConfig;
use crate::fallback::FallbackOrchestrator;
use crate::http::HttpClient;
use crate::insights::{Insight, InsightContext, build_insights};
use crate::models::{AirQualitySeries, Location, Provenance, WeatherSeries};
use crate::normalizer::normalize;
use crate::providers::{OpenMeteoForecastClient, default_chain};
use crate::synthetic;
use crate::weather::WeatherService;

/// Everything one cycle produced, ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub location: Location,
    pub air_quality: AirQualitySeries,
    pub aqi: AqiResult,
    /// Provider that delivered the reading, `None` when the chain was exhausted
    pub provenance: Option<Provenance>,
    /// Providers tried before the successful one
    pub failed_providers: Vec<Provenance>,
    pub weather: Option<WeatherSeries>,
    pub traffic: Vec<u8>,
    pub energy: Vec<u8>,
    /// Labels shared by the weather, traffic and energy charts
    pub hour_labels: Vec<String>,
    pub insights: Vec<Insight>,
    pub generated_at: DateTime<FixedOffset>,
}

impl DashboardSnapshot {
    /// Whether the air-quality chart should show the "No Data" placeholder
    #[must_use]
    pub fn has_air_quality(&self) -> bool {
        !self.air_quality.is_empty()
    }
}

pub struct DashboardSession {
    orchestrator: FallbackOrchestrator,
    forecast: OpenMeteoForecastClient,
    weather: WeatherService,
    forecast_hours: usize,
    refresh_interval: Duration,
}

impl DashboardSession {
    #[must_use]
    pub fn new(
        orchestrator: FallbackOrchestrator,
        forecast: OpenMeteoForecastClient,
        weather: WeatherService,
        forecast_hours: usize,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            forecast,
            weather,
            forecast_hours,
            refresh_interval,
        }
    }

    /// Wire the full provider chain and side services onto one HTTP client
    #[must_use]
    pub fn from_config(config: &DashboardConfig, http: Arc<dyn HttpClient>) -> Self {
        let orchestrator = FallbackOrchestrator::new(
            default_chain(&config.providers, Arc::clone(&http)),
            config.providers.timeout(),
        );
        Self::new(
            orchestrator,
            OpenMeteoForecastClient::new(Arc::clone(&http)),
            WeatherService::from_config(http, &config.weather),
            config.weather.forecast_hours as usize,
            config.refresh.interval(),
        )
    }

    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Run a cycle stamped with the local wall clock
    pub async fn run_cycle(&self, location: &Location, auto_refresh: bool) -> DashboardSnapshot {
        self.run_cycle_at(location, auto_refresh, Local::now().fixed_offset())
            .await
    }

    /// Run a cycle with an explicit fetch time
    #[instrument(skip(self, location), fields(city = %location.name))]
    pub async fn run_cycle_at(
        &self,
        location: &Location,
        auto_refresh: bool,
        fetched_at: DateTime<FixedOffset>,
    ) -> DashboardSnapshot {
        let start_time = Instant::now();
        let coords = location.coordinates;

        let (outcome, forecast, weather) = tokio::join!(
            self.orchestrator
                .fetch_air_quality(coords, Some(location.name.as_str())),
            self.forecast.fetch_forecast(coords),
            self.weather.fetch_weather(coords, fetched_at),
        );

        let air_quality = normalize(&outcome.reading, forecast.as_ref(), fetched_at);
        let aqi = resolve_aqi(
            air_quality.current_raw_index,
            air_quality.mean_pm25().or(air_quality.current_pm25),
            air_quality.mean_pm10().or(air_quality.current_pm10),
        );
        let provenance = outcome.reading.provenance();

        let start_hour = fetched_at.hour();
        let temperatures = weather
            .as_ref()
            .map(|w| w.temperatures.as_slice())
            .unwrap_or_default();
        let (traffic, energy) = {
            let mut rng = rand::rng();
            (
                synthetic::traffic(start_hour, self.forecast_hours, &mut rng),
                synthetic::energy(start_hour, temperatures, self.forecast_hours, &mut rng),
            )
        };
        let hour_labels = synthetic::hour_labels(start_hour, self.forecast_hours, weather.as_ref());

        let insights = build_insights(&InsightContext {
            location,
            aqi: &aqi,
            provenance,
            current_pm25: air_quality.current_pm25,
            current_pm10: air_quality.current_pm10,
            current_temperature: weather.as_ref().and_then(|w| w.current_temperature),
            traffic: &traffic,
            energy: &energy,
            auto_refresh: auto_refresh.then_some(self.refresh_interval),
        });

        info!(
            "Cycle for {} finished in {:?}: {} (AQI {}) from {}",
            location.name,
            start_time.elapsed(),
            aqi.label,
            aqi.value,
            provenance.map_or("no provider", |p| p.as_str())
        );

        DashboardSnapshot {
            location: location.clone(),
            air_quality,
            aqi,
            provenance,
            failed_providers: outcome.failures.iter().map(|f| f.provenance).collect(),
            weather,
            traffic,
            energy,
            hour_labels,
            insights,
            generated_at: fetched_at,
        }
    }
}
