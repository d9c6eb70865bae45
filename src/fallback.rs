//! Sequential provider fallback
//!
//! Providers are tried strictly one after another in priority order. The first
//! reading that carries data ends the chain; later (rate-limited) providers are
//! only contacted when everything before them failed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::models::{Coordinates, RawReading};
use crate::providers::{AirQualityProvider, FailureReason, ProviderFailure};

/// Result of one pass over the chain
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// First usable reading, or [`RawReading::Empty`]
    pub reading: RawReading,
    /// Providers that were tried and failed, in order
    pub failures: Vec<ProviderFailure>,
}

pub struct FallbackOrchestrator {
    providers: Vec<Arc<dyn AirQualityProvider>>,
    timeout: Duration,
}

impl FallbackOrchestrator {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn AirQualityProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Try each provider in order and return the first reading with data.
    ///
    /// Never fails: an exhausted chain yields [`RawReading::Empty`].
    #[instrument(skip(self))]
    pub async fn fetch_air_quality(
        &self,
        coords: Coordinates,
        city: Option<&str>,
    ) -> FetchOutcome {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let provenance = provider.provenance();
            let start_time = Instant::now();

            let result = match tokio::time::timeout(self.timeout, provider.fetch(coords, city)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderFailure::new(provenance, FailureReason::Timeout)),
            };

            match result {
                Ok(reading) if reading.has_data() => {
                    info!(
                        "Air quality from {} in {:?} after {} failed attempts",
                        provenance,
                        start_time.elapsed(),
                        failures.len()
                    );
                    return FetchOutcome { reading, failures };
                }
                Ok(_) => {
                    warn!("{} returned no usable data, trying next provider", provenance);
                    failures.push(ProviderFailure::new(provenance, FailureReason::NoData));
                }
                Err(failure) => {
                    warn!("{}, trying next provider", failure);
                    failures.push(failure);
                }
            }
        }

        warn!(
            "All {} air quality providers failed",
            self.providers.len()
        );
        FetchOutcome {
            reading: RawReading::Empty,
            failures,
        }
    }
}
