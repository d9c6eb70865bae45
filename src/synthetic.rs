//! Simulated traffic and energy load
//!
//! Neither signal has a live source. Values follow simple time-of-day profiles
//! with random jitter and are expressed as percentages of capacity.

use std::fmt;

use rand::RngExt;

use crate::models::WeatherSeries;

const DEFAULT_TEMPERATURE: f64 = 20.0;
const EXTREME_TEMPERATURE_BOOST: u8 = 15;

/// Congestion percentage per hour, starting at `start_hour`
pub fn traffic<R: RngExt + ?Sized>(start_hour: u32, hours: usize, rng: &mut R) -> Vec<u8> {
    (0..hours)
        .map(|offset| {
            let hour = hour_at(start_hour, offset);
            match hour {
                7..=9 | 17..=19 => rng.random_range(85..=95),
                22..=23 | 0..=5 => rng.random_range(20..=35),
                _ => rng.random_range(50..=70),
            }
        })
        .collect()
}

/// Grid load percentage per hour.
///
/// Temperatures below 10 °C or above 30 °C add heating or cooling demand.
/// Hours without a temperature use 20 °C.
pub fn energy<R: RngExt + ?Sized>(
    start_hour: u32,
    temperatures: &[f64],
    hours: usize,
    rng: &mut R,
) -> Vec<u8> {
    (0..hours)
        .map(|offset| {
            let hour = hour_at(start_hour, offset);
            let base: u8 = match hour {
                6..=10 | 18..=22 => rng.random_range(70..=85),
                23 | 0..=5 => rng.random_range(30..=45),
                _ => rng.random_range(50..=65),
            };
            let temperature = temperatures
                .get(offset)
                .copied()
                .unwrap_or(DEFAULT_TEMPERATURE);
            let boost = if !(10.0..=30.0).contains(&temperature) {
                EXTREME_TEMPERATURE_BOOST
            } else {
                0
            };
            base.saturating_add(boost).min(100)
        })
        .collect()
}

/// Labels for the synthetic charts: weather labels when present, otherwise
/// `HH:00` counting from the start hour
#[must_use]
pub fn hour_labels(start_hour: u32, hours: usize, weather: Option<&WeatherSeries>) -> Vec<String> {
    if let Some(series) = weather
        && !series.time_labels.is_empty()
    {
        return series.time_labels.iter().take(hours).cloned().collect();
    }
    (0..hours)
        .map(|offset| format!("{:02}:00", hour_at(start_hour, offset)))
        .collect()
}

fn hour_at(start_hour: u32, offset: usize) -> u32 {
    (start_hour + (offset % 24) as u32) % 24
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficLevel {
    Heavy,
    Moderate,
    Light,
}

impl TrafficLevel {
    #[must_use]
    pub fn from_average(average: f64) -> Self {
        if average >= 80.0 {
            TrafficLevel::Heavy
        } else if average >= 60.0 {
            TrafficLevel::Moderate
        } else {
            TrafficLevel::Light
        }
    }
}

impl fmt::Display for TrafficLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrafficLevel::Heavy => "Heavy",
            TrafficLevel::Moderate => "Moderate",
            TrafficLevel::Light => "Light",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyLevel {
    High,
    Normal,
    Low,
}

impl EnergyLevel {
    #[must_use]
    pub fn from_average(average: f64) -> Self {
        if average >= 70.0 {
            EnergyLevel::High
        } else if average >= 50.0 {
            EnergyLevel::Normal
        } else {
            EnergyLevel::Low
        }
    }
}

impl fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EnergyLevel::High => "High",
            EnergyLevel::Normal => "Normal",
            EnergyLevel::Low => "Low",
        })
    }
}

/// Mean of a percentage series, `None` when empty
#[must_use]
pub fn average(values: &[u8]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(8, 85, 95)]
    #[case(18, 85, 95)]
    #[case(23, 20, 35)]
    #[case(3, 20, 35)]
    #[case(13, 50, 70)]
    fn test_traffic_profile(#[case] hour: u32, #[case] low: u8, #[case] high: u8) {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let value = traffic(hour, 1, &mut rng)[0];
            assert!((low..=high).contains(&value), "{value} outside {low}..={high}");
        }
    }

    #[rstest]
    #[case(7, 20.0, 70, 85)]
    #[case(2, 20.0, 30, 45)]
    #[case(14, 20.0, 50, 65)]
    #[case(14, 35.0, 65, 80)]
    #[case(19, -5.0, 85, 100)]
    fn test_energy_profile(
        #[case] hour: u32,
        #[case] temperature: f64,
        #[case] low: u8,
        #[case] high: u8,
    ) {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let value = energy(hour, &[temperature], 1, &mut rng)[0];
            assert!((low..=high).contains(&value), "{value} outside {low}..={high}");
        }
    }

    #[test]
    fn test_series_wrap_midnight() {
        let mut rng = rand::rng();
        let values = traffic(22, 24, &mut rng);
        assert_eq!(values.len(), 24);
        assert_eq!(
            hour_labels(22, 4, None),
            vec!["22:00", "23:00", "00:00", "01:00"]
        );
    }

    #[test]
    fn test_labels_prefer_weather() {
        let weather = WeatherSeries {
            time_labels: vec!["12:00".into(), "13:00".into()],
            temperatures: vec![10.0, 11.0],
            ..WeatherSeries::default()
        };
        assert_eq!(hour_labels(5, 24, Some(&weather)), vec!["12:00", "13:00"]);
        assert_eq!(hour_labels(5, 1, Some(&WeatherSeries::default())), vec!["05:00"]);
    }

    #[rstest]
    #[case(85.0, TrafficLevel::Heavy, EnergyLevel::High)]
    #[case(65.0, TrafficLevel::Moderate, EnergyLevel::Normal)]
    #[case(40.0, TrafficLevel::Light, EnergyLevel::Low)]
    fn test_levels(#[case] avg: f64, #[case] traffic: TrafficLevel, #[case] energy: EnergyLevel) {
        assert_eq!(TrafficLevel::from_average(avg), traffic);
        assert_eq!(EnergyLevel::from_average(avg), energy);
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[50, 70]), Some(60.0));
        assert_eq!(average(&[]), None);
    }
}
