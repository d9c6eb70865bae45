//! Air quality models: provider readings and the canonical series
//!
//! Every provider adapter produces exactly one [`RawReading`] variant at parse
//! time. Downstream code dispatches on the variant, never on payload keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Particulate pollutants tracked by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    Pm25,
    Pm10,
}

impl Pollutant {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm25",
            Pollutant::Pm10 => "pm10",
        }
    }

    /// Parse a vendor parameter name ("pm25", "PM2.5", "pm2_5", "pm10", ...)
    #[must_use]
    pub fn from_parameter(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "pm25" | "pm2.5" | "pm2_5" => Some(Pollutant::Pm25),
            "pm10" => Some(Pollutant::Pm10),
            _ => None,
        }
    }
}

/// Which provider produced a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    ApiNinjas,
    AqicnCity,
    AqicnGeo,
    OpenMeteo,
    Generic,
    OpenAq,
}

impl Provenance {
    /// Stable identifier used in logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::ApiNinjas => "api-ninjas",
            Provenance::AqicnCity => "aqicn-city",
            Provenance::AqicnGeo => "aqicn-geo",
            Provenance::OpenMeteo => "open-meteo",
            Provenance::Generic => "generic",
            Provenance::OpenAq => "openaq",
        }
    }

    /// Source name shown next to the AQI in the insights panel
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Provenance::ApiNinjas => "API Ninjas (Live)",
            Provenance::AqicnCity | Provenance::AqicnGeo => "AQICN (Live)",
            Provenance::OpenMeteo => "Open-Meteo",
            Provenance::Generic => "Custom Feed",
            Provenance::OpenAq => "OpenAQ",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API-Ninjas current conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiNinjasReading {
    pub overall_aqi: Option<f64>,
    pub pm25_concentration: Option<f64>,
    pub pm10_concentration: Option<f64>,
}

/// AQICN station feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AqicnReading {
    pub aqi: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
}

/// Open-Meteo `current` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenMeteoCurrent {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub us_aqi: Option<f64>,
    pub european_aqi: Option<f64>,
}

impl OpenMeteoCurrent {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pm25.is_none()
            && self.pm10.is_none()
            && self.us_aqi.is_none()
            && self.european_aqi.is_none()
    }
}

/// Column-oriented hourly pollutant series; entries may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    pub timestamps: Vec<String>,
    pub pm25: Vec<Option<f64>>,
    pub pm10: Vec<Option<f64>>,
}

impl HourlySeries {
    /// True when all three columns are non-empty and of equal length
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        !self.timestamps.is_empty()
            && self.timestamps.len() == self.pm25.len()
            && self.timestamps.len() == self.pm10.len()
    }
}

/// Open-Meteo air-quality response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenMeteoReading {
    pub current: OpenMeteoCurrent,
    pub hourly: Option<HourlySeries>,
}

/// One OpenAQ measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAqSample {
    pub parameter: Pollutant,
    pub value: f64,
    pub timestamp_utc: String,
}

/// One entry of a generic feed's forecast list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericSample {
    /// Unix timestamp in seconds
    pub timestamp: Option<i64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
}

/// Reading from a generic JSON feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericReading {
    pub aqi: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub forecast_samples: Vec<GenericSample>,
}

/// Hourly forecast fetched independently of the primary reading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub hourly: HourlySeries,
}

/// Result of one fetch cycle, tagged by the provider family that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawReading {
    ApiNinjas {
        provenance: Provenance,
        data: ApiNinjasReading,
    },
    Aqicn {
        provenance: Provenance,
        data: AqicnReading,
    },
    OpenMeteo {
        provenance: Provenance,
        data: OpenMeteoReading,
    },
    OpenAqSeries {
        provenance: Provenance,
        samples: Vec<OpenAqSample>,
    },
    Generic {
        provenance: Provenance,
        data: GenericReading,
    },
    /// No usable data anywhere; terminal for the cycle
    Empty,
}

impl RawReading {
    /// Provider that produced this reading, `None` for [`RawReading::Empty`]
    #[must_use]
    pub fn provenance(&self) -> Option<Provenance> {
        match self {
            RawReading::ApiNinjas { provenance, .. }
            | RawReading::Aqicn { provenance, .. }
            | RawReading::OpenMeteo { provenance, .. }
            | RawReading::OpenAqSeries { provenance, .. }
            | RawReading::Generic { provenance, .. } => Some(*provenance),
            RawReading::Empty => None,
        }
    }

    /// Whether the reading carries at least one usable value
    #[must_use]
    pub fn has_data(&self) -> bool {
        match self {
            RawReading::ApiNinjas { data, .. } => {
                data.overall_aqi.is_some()
                    || data.pm25_concentration.is_some()
                    || data.pm10_concentration.is_some()
            }
            RawReading::Aqicn { data, .. } => {
                data.aqi.is_some() || data.pm25.is_some() || data.pm10.is_some()
            }
            RawReading::OpenMeteo { data, .. } => {
                !data.current.is_empty()
                    || data
                        .hourly
                        .as_ref()
                        .is_some_and(|hourly| !hourly.timestamps.is_empty())
            }
            RawReading::OpenAqSeries { samples, .. } => !samples.is_empty(),
            RawReading::Generic { data, .. } => {
                data.aqi.is_some()
                    || data.pm25.is_some()
                    || data.pm10.is_some()
                    || !data.forecast_samples.is_empty()
            }
            RawReading::Empty => false,
        }
    }
}

/// Canonical time-ordered PM2.5/PM10 series plus the current snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirQualitySeries {
    /// `HH:MM` labels in chronological order
    pub time_labels: Vec<String>,
    pub pm25: Vec<f64>,
    pub pm10: Vec<f64>,
    pub current_pm25: Option<f64>,
    pub current_pm10: Option<f64>,
    /// Vendor-native index, if the provider supplied one
    pub current_raw_index: Option<f64>,
}

impl AirQualitySeries {
    /// Build a series from three columns, truncating to the shortest so the
    /// columns always have equal length.
    #[must_use]
    pub fn from_columns(mut time_labels: Vec<String>, mut pm25: Vec<f64>, mut pm10: Vec<f64>) -> Self {
        let len = time_labels.len().min(pm25.len()).min(pm10.len());
        time_labels.truncate(len);
        pm25.truncate(len);
        pm10.truncate(len);
        Self {
            time_labels,
            pm25,
            pm10,
            ..Self::default()
        }
    }

    /// Attach current values
    #[must_use]
    pub fn with_current(
        mut self,
        pm25: Option<f64>,
        pm10: Option<f64>,
        raw_index: Option<f64>,
    ) -> Self {
        self.current_pm25 = pm25;
        self.current_pm10 = pm10;
        self.current_raw_index = raw_index;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.time_labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time_labels.is_empty()
    }

    /// Mean PM2.5 over the series, `None` unless positive
    #[must_use]
    pub fn mean_pm25(&self) -> Option<f64> {
        mean(&self.pm25)
    }

    /// Mean PM10 over the series, `None` unless positive
    #[must_use]
    pub fn mean_pm10(&self) -> Option<f64> {
        mean(&self.pm10)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    (mean > 0.0).then_some(mean)
}
