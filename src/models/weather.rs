//! Weather series model consumed by the dashboard

use serde::{Deserialize, Serialize};

/// Canonical hourly temperature series
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct WeatherSeries {
    /// `HH:MM` labels in chronological order
    pub time_labels: Vec<String>,
    /// Temperature in Celsius, one per label
    pub temperatures: Vec<f64>,
    /// Current temperature in Celsius
    pub current_temperature: Option<f64>,
    /// Current relative humidity in percent
    pub current_humidity: Option<f64>,
}

impl WeatherSeries {
    /// Temperature for the given hour offset, if the series covers it
    #[must_use]
    pub fn temperature_at(&self, index: usize) -> Option<f64> {
        self.temperatures.get(index).copied()
    }
}
