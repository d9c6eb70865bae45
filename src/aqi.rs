//! US EPA Air Quality Index calculation
//!
//! Converts particulate concentrations (µg/m³) into the 0-500 US AQI scale with
//! piecewise-linear breakpoint interpolation, and resolves the index shown on
//! the dashboard from whatever a provider supplied.

use serde::Serialize;
use std::fmt;

use crate::models::Pollutant;
use crate::{DashboardError, Result};

/// Highest value on the US AQI scale
pub const MAX_AQI: u16 = 500;

/// Native indices above this are already on the US scale; `1..=5` is a vendor scale
pub const VENDOR_SCALE_CUTOFF: f64 = 5.0;

/// Color used when no pollutant data is available
pub const NO_DATA_COLOR: &str = "#94a3b8";

/// One concentration band mapped to an index band
#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    c_low: f64,
    c_high: f64,
    i_low: u16,
    i_high: u16,
}

const fn bp(c_low: f64, c_high: f64, i_low: u16, i_high: u16) -> Breakpoint {
    Breakpoint {
        c_low,
        c_high,
        i_low,
        i_high,
    }
}

const PM25_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 12.0, 0, 50),
    bp(12.1, 35.4, 51, 100),
    bp(35.5, 55.4, 101, 150),
    bp(55.5, 150.4, 151, 200),
    bp(150.5, 250.4, 201, 300),
    bp(250.5, 500.4, 301, 500),
];

const PM10_BREAKPOINTS: [Breakpoint; 6] = [
    bp(0.0, 54.0, 0, 50),
    bp(55.0, 154.0, 51, 100),
    bp(155.0, 254.0, 101, 150),
    bp(255.0, 354.0, 151, 200),
    bp(355.0, 424.0, 201, 300),
    bp(425.0, 604.0, 301, 500),
];

fn breakpoints(pollutant: Pollutant) -> &'static [Breakpoint; 6] {
    match pollutant {
        Pollutant::Pm25 => &PM25_BREAKPOINTS,
        Pollutant::Pm10 => &PM10_BREAKPOINTS,
    }
}

/// Compute the US AQI for a concentration in µg/m³.
///
/// Concentrations above the top band saturate at 500. Values that fall between
/// two published bands are interpolated from the start of the next band.
///
/// # Errors
///
/// Returns [`DashboardError::Calculation`] for negative or non-finite input.
pub fn us_aqi_from_concentration(concentration: f64, pollutant: Pollutant) -> Result<u16> {
    if !concentration.is_finite() || concentration < 0.0 {
        return Err(DashboardError::calculation(format!(
            "{} concentration must be a non-negative number, got {concentration}",
            pollutant.as_str()
        )));
    }

    for band in breakpoints(pollutant) {
        if concentration <= band.c_high {
            let c = concentration.max(band.c_low);
            let slope = f64::from(band.i_high - band.i_low) / (band.c_high - band.c_low);
            let index = slope * (c - band.c_low) + f64::from(band.i_low);
            return Ok(index.round().clamp(0.0, f64::from(MAX_AQI)) as u16);
        }
    }

    Ok(MAX_AQI)
}

/// Health category attached to an index value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AqiLabel {
    Good,
    Moderate,
    UnhealthyForSensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    // 5-level vendor scale
    Fair,
    Poor,
    VeryPoor,
    NoData,
}

impl AqiLabel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AqiLabel::Good => "Good",
            AqiLabel::Moderate => "Moderate",
            AqiLabel::UnhealthyForSensitive => "Unhealthy for Sensitive",
            AqiLabel::Unhealthy => "Unhealthy",
            AqiLabel::VeryUnhealthy => "Very Unhealthy",
            AqiLabel::Hazardous => "Hazardous",
            AqiLabel::Fair => "Fair",
            AqiLabel::Poor => "Poor",
            AqiLabel::VeryPoor => "Very Poor",
            AqiLabel::NoData => "No Data",
        }
    }
}

impl fmt::Display for AqiLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index value, category and display color
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqiResult {
    pub value: u16,
    pub label: AqiLabel,
    pub severity_color: &'static str,
    /// Vendor-native index the result was derived from, if any
    pub raw_aqi: Option<f64>,
}

impl AqiResult {
    /// Result used when no usable index or concentration exists
    #[must_use]
    pub fn no_data() -> Self {
        Self {
            value: 0,
            label: AqiLabel::NoData,
            severity_color: NO_DATA_COLOR,
            raw_aqi: None,
        }
    }

    #[must_use]
    pub fn is_no_data(&self) -> bool {
        self.label == AqiLabel::NoData
    }

    /// Whether sensitive groups should be warned
    #[must_use]
    pub fn is_unhealthy(&self) -> bool {
        !self.is_no_data() && self.value > 100
    }

    fn classified(value: u16, raw_aqi: Option<f64>) -> Self {
        let (label, severity_color) = classify(value);
        Self {
            value,
            label,
            severity_color,
            raw_aqi,
        }
    }
}

/// Map a US AQI value to its category and color
#[must_use]
pub fn classify(value: u16) -> (AqiLabel, &'static str) {
    match value {
        0..=50 => (AqiLabel::Good, "#10b981"),
        51..=100 => (AqiLabel::Moderate, "#84cc16"),
        101..=150 => (AqiLabel::UnhealthyForSensitive, "#f59e0b"),
        151..=200 => (AqiLabel::Unhealthy, "#f97316"),
        201..=300 => (AqiLabel::VeryUnhealthy, "#ef4444"),
        _ => (AqiLabel::Hazardous, "#991b1b"),
    }
}

fn vendor_level(level: u8) -> Option<(u16, AqiLabel)> {
    match level {
        1 => Some((50, AqiLabel::Good)),
        2 => Some((100, AqiLabel::Fair)),
        3 => Some((150, AqiLabel::Moderate)),
        4 => Some((200, AqiLabel::Poor)),
        5 => Some((300, AqiLabel::VeryPoor)),
        _ => None,
    }
}

/// Resolve the index shown to the user.
///
/// Priority: a native US-scale index in `(5, 500]`, then a native 1-5 vendor
/// level, then PM2.5, then PM10, then "No Data".
#[must_use]
pub fn resolve_aqi(native_index: Option<f64>, pm25: Option<f64>, pm10: Option<f64>) -> AqiResult {
    let native = native_index.filter(|v| v.is_finite());

    if let Some(index) = native {
        if index > VENDOR_SCALE_CUTOFF && index <= f64::from(MAX_AQI) {
            return AqiResult::classified(index.round() as u16, Some(index));
        }
        if (1.0..=VENDOR_SCALE_CUTOFF).contains(&index) {
            if let Some((value, label)) = vendor_level(index.round() as u8) {
                let (_, severity_color) = classify(value);
                return AqiResult {
                    value,
                    label,
                    severity_color,
                    raw_aqi: Some(index),
                };
            }
        }
    }

    let from_concentration = |value: Option<f64>, pollutant: Pollutant| {
        value
            .filter(|c| c.is_finite() && *c > 0.0)
            .and_then(|c| us_aqi_from_concentration(c, pollutant).ok())
    };

    if let Some(value) = from_concentration(pm25, Pollutant::Pm25) {
        return AqiResult::classified(value, native);
    }
    if let Some(value) = from_concentration(pm10, Pollutant::Pm10) {
        return AqiResult::classified(value, native);
    }

    AqiResult {
        raw_aqi: native,
        ..AqiResult::no_data()
    }
}
