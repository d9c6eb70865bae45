//! Insight lines shown next to the charts

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::DashboardError;
use crate::aqi::AqiResult;
use crate::models::{Location, Provenance};
use crate::synthetic::{EnergyLevel, TrafficLevel, average};

/// One titled line of the insights panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub title: &'static str,
    pub text: String,
}

impl Insight {
    fn new(title: &'static str, text: impl Into<String>) -> Self {
        Self {
            title,
            text: text.into(),
        }
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.text)
    }
}

/// Everything a completed cycle knows that the insights mention
#[derive(Debug, Clone)]
pub struct InsightContext<'a> {
    pub location: &'a Location,
    pub aqi: &'a AqiResult,
    pub provenance: Option<Provenance>,
    pub current_pm25: Option<f64>,
    pub current_pm10: Option<f64>,
    pub current_temperature: Option<f64>,
    pub traffic: &'a [u8],
    pub energy: &'a [u8],
    /// Refresh interval while auto-refresh is on
    pub auto_refresh: Option<Duration>,
}

#[must_use]
pub fn build_insights(ctx: &InsightContext<'_>) -> Vec<Insight> {
    let mut insights = vec![Insight::new(
        "Location",
        format!(
            "{} ({})",
            ctx.location.name,
            format_hemisphere(ctx.location.coordinates.lat, ctx.location.coordinates.lon)
        ),
    )];

    if ctx.aqi.is_no_data() {
        insights.push(Insight::new(
            "Air Quality",
            "No recent data available for this location.",
        ));
        insights.push(Insight::new(
            "Tip",
            "Try a major city name. Air quality data may not be available for all locations.",
        ));
    } else {
        let source = ctx
            .provenance
            .map_or("Calculated", |provenance| provenance.display_name());
        insights.push(Insight::new(
            "Air Quality",
            format!("{} (AQI: {}) [{}]", ctx.aqi.label, ctx.aqi.value, source),
        ));
        if let Some(pm25) = ctx.current_pm25 {
            insights.push(Insight::new("PM2.5", format!("{pm25:.1} µg/m³")));
        }
        if let Some(pm10) = ctx.current_pm10 {
            insights.push(Insight::new("PM10", format!("{pm10:.1} µg/m³")));
        }
        if ctx.aqi.is_unhealthy() {
            insights.push(Insight::new(
                "Health Alert",
                format!(
                    "Air quality is {}. Sensitive groups should limit outdoor activities.",
                    ctx.aqi.label.as_str().to_lowercase()
                ),
            ));
        }
    }

    if let Some(temperature) = ctx.current_temperature {
        insights.push(Insight::new(
            "Current Temperature",
            format!("{}°C", temperature.round()),
        ));
        if temperature > 30.0 {
            insights.push(Insight::new(
                "Weather Note",
                "High temperature detected. Stay hydrated and avoid prolonged sun exposure.",
            ));
        } else if temperature < 10.0 {
            insights.push(Insight::new(
                "Weather Note",
                "Low temperature. Dress warmly and be cautious of icy conditions.",
            ));
        }
    }

    if let Some(avg) = average(ctx.traffic) {
        insights.push(Insight::new(
            "Traffic Density",
            format!("Average {}% ({})", avg.round(), TrafficLevel::from_average(avg)),
        ));
    }
    if let Some(avg) = average(ctx.energy) {
        insights.push(Insight::new(
            "Energy Consumption",
            format!("Average index {} ({})", avg.round(), EnergyLevel::from_average(avg)),
        ));
    }

    insights.push(Insight::new(
        "Data Status",
        match ctx.auto_refresh {
            Some(interval) => format!("Auto-refresh enabled ({}s interval)", interval.as_secs()),
            None => "Auto-refresh disabled".to_string(),
        },
    ));

    insights
}

/// Error panel: message plus a remediation tip
#[must_use]
pub fn error_insights(error: &DashboardError) -> Vec<Insight> {
    vec![
        Insight::new("Error", error.user_message()),
        Insight::new("Tip", error.remediation_hint()),
    ]
}

fn format_hemisphere(lat: f64, lon: f64) -> String {
    format!(
        "{:.4}°{}, {:.4}°{}",
        lat.abs(),
        if lat >= 0.0 { 'N' } else { 'S' },
        lon.abs(),
        if lon >= 0.0 { 'E' } else { 'W' }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::resolve_aqi;
    use crate::models::Coordinates;

    fn create_test_location() -> Location {
        Location::new(Coordinates::new(28.6139, 77.209).unwrap(), "Delhi".into())
    }

    fn titles(insights: &[Insight]) -> Vec<&'static str> {
        insights.iter().map(|i| i.title).collect()
    }

    #[test]
    fn test_unhealthy_reading() {
        let location = create_test_location();
        let aqi = resolve_aqi(Some(168.0), None, None);
        let ctx = InsightContext {
            location: &location,
            aqi: &aqi,
            provenance: Some(Provenance::AqicnCity),
            current_pm25: Some(88.04),
            current_pm10: None,
            current_temperature: Some(33.2),
            traffic: &[90, 80],
            energy: &[40, 50],
            auto_refresh: Some(Duration::from_secs(60)),
        };
        let insights = build_insights(&ctx);

        assert_eq!(
            titles(&insights),
            vec![
                "Location",
                "Air Quality",
                "PM2.5",
                "Health Alert",
                "Current Temperature",
                "Weather Note",
                "Traffic Density",
                "Energy Consumption",
                "Data Status"
            ]
        );
        assert_eq!(insights[0].text, "Delhi (28.6139°N, 77.2090°E)");
        assert_eq!(insights[1].text, "Unhealthy (AQI: 168) [AQICN (Live)]");
        assert_eq!(insights[2].text, "88.0 µg/m³");
        assert!(insights[3].text.starts_with("Air quality is unhealthy."));
        assert_eq!(insights[4].text, "33°C");
        assert_eq!(insights[6].text, "Average 85% (Heavy)");
        assert_eq!(insights[7].text, "Average index 45 (Low)");
        assert_eq!(insights[8].text, "Auto-refresh enabled (60s interval)");
    }

    #[test]
    fn test_no_data_reading() {
        let location = Location::new(Coordinates::new(-33.8688, -70.6).unwrap(), "Santiago".into());
        let aqi = AqiResult::no_data();
        let ctx = InsightContext {
            location: &location,
            aqi: &aqi,
            provenance: None,
            current_pm25: None,
            current_pm10: None,
            current_temperature: None,
            traffic: &[],
            energy: &[],
            auto_refresh: None,
        };
        let insights = build_insights(&ctx);

        assert_eq!(insights[0].text, "Santiago (33.8688°S, 70.6000°W)");
        assert_eq!(
            titles(&insights),
            vec!["Location", "Air Quality", "Tip", "Data Status"]
        );
        assert_eq!(insights[3].to_string(), "Data Status: Auto-refresh disabled");
    }

    #[test]
    fn test_error_insights() {
        let insights = error_insights(&DashboardError::geocode("Atlantis"));
        assert_eq!(titles(&insights), vec!["Error", "Tip"]);
        assert!(insights[1].text.contains("\"London\""));
    }
}
