//! Reading normalization
//!
//! Turns any [`RawReading`] variant into the canonical [`AirQualitySeries`].
//! The transform is pure: the fetch time is passed in, so normalizing the
//! same reading twice yields identical output.
//!
//! Missing values (nulls, negatives, pollutants absent at a timestamp) are
//! filled sample-and-hold: a gap repeats the previous value of the same
//! pollutant, leading gaps take the first later value, and a pollutant with no
//! values at all becomes a zero series.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Utc};

use crate::models::{
    AirQualitySeries, ForecastPayload, GenericReading, HourlySeries, OpenAqSample,
    OpenMeteoReading, Pollutant, RawReading,
};

/// Hourly points taken from Open-Meteo and generic forecasts
pub const MAX_HOURLY_POINTS: usize = 24;

/// Most recent OpenAQ points kept per pollutant and after merging
pub const MAX_OPENAQ_POINTS: usize = 30;

const LABEL_FORMAT: &str = "%H:%M";
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Normalize a reading, using `forecast` to backfill Open-Meteo hourly data
#[must_use]
pub fn normalize(
    reading: &RawReading,
    forecast: Option<&ForecastPayload>,
    fetched_at: DateTime<FixedOffset>,
) -> AirQualitySeries {
    match reading {
        RawReading::ApiNinjas { data, .. } => {
            let pm25 = valid(data.pm25_concentration);
            let pm10 = valid(data.pm10_concentration);
            single_sample(pm25, pm10, fetched_at).with_current(pm25, pm10, data.overall_aqi)
        }
        RawReading::Aqicn { data, .. } => {
            let pm25 = valid(data.pm25);
            let pm10 = valid(data.pm10);
            single_sample(pm25, pm10, fetched_at).with_current(pm25, pm10, data.aqi)
        }
        RawReading::OpenMeteo { data, .. } => normalize_open_meteo(data, forecast, fetched_at),
        RawReading::OpenAqSeries { samples, .. } => normalize_openaq(samples, fetched_at),
        RawReading::Generic { data, .. } => normalize_generic(data, fetched_at),
        RawReading::Empty => AirQualitySeries::default(),
    }
}

fn normalize_open_meteo(
    data: &OpenMeteoReading,
    forecast: Option<&ForecastPayload>,
    fetched_at: DateTime<FixedOffset>,
) -> AirQualitySeries {
    let pm25 = valid(data.current.pm25);
    let pm10 = valid(data.current.pm10);
    let raw_index = data.current.us_aqi.or(data.current.european_aqi);

    let hourly = data
        .hourly
        .as_ref()
        .filter(|h| h.is_aligned())
        .or_else(|| forecast.map(|f| &f.hourly).filter(|h| h.is_aligned()));

    let series = match hourly {
        Some(hourly) => hourly_series(hourly, fetched_at),
        None => single_sample(pm25, pm10, fetched_at),
    };
    series.with_current(pm25, pm10, raw_index)
}

fn hourly_series(hourly: &HourlySeries, fetched_at: DateTime<FixedOffset>) -> AirQualitySeries {
    let len = hourly.timestamps.len().min(MAX_HOURLY_POINTS);
    let labels = hourly.timestamps[..len]
        .iter()
        .map(|ts| time_label(ts, fetched_at))
        .collect();
    AirQualitySeries::from_columns(
        labels,
        fill_gaps(&hourly.pm25[..len]),
        fill_gaps(&hourly.pm10[..len]),
    )
}

fn normalize_openaq(samples: &[OpenAqSample], fetched_at: DateTime<FixedOffset>) -> AirQualitySeries {
    let pm25_samples = recent_ascending(samples, Pollutant::Pm25, fetched_at);
    let pm10_samples = recent_ascending(samples, Pollutant::Pm10, fetched_at);

    let mut merged: BTreeMap<SampleKey, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for (key, value) in &pm25_samples {
        let slot = merged.entry(*key).or_default();
        slot.0 = valid(Some(*value)).or(slot.0);
    }
    for (key, value) in &pm10_samples {
        let slot = merged.entry(*key).or_default();
        slot.1 = valid(Some(*value)).or(slot.1);
    }

    let skip = merged.len().saturating_sub(MAX_OPENAQ_POINTS);
    let points: Vec<_> = merged.into_iter().skip(skip).collect();

    let labels = points
        .iter()
        .map(|((at, _), _)| at.with_timezone(fetched_at.offset()).format(LABEL_FORMAT).to_string())
        .collect();
    let pm25: Vec<Option<f64>> = points.iter().map(|(_, (pm25, _))| *pm25).collect();
    let pm10: Vec<Option<f64>> = points.iter().map(|(_, (_, pm10))| *pm10).collect();

    let latest = |samples: &[(SampleKey, f64)]| {
        samples.iter().rev().find_map(|(_, value)| valid(Some(*value)))
    };

    AirQualitySeries::from_columns(labels, fill_gaps(&pm25), fill_gaps(&pm10)).with_current(
        latest(pm25_samples.as_slice()),
        latest(pm10_samples.as_slice()),
        None,
    )
}

/// Ordering key of an OpenAQ sample: its instant, plus a sequence number
/// that keeps samples with an unparseable timestamp apart
type SampleKey = (DateTime<Utc>, usize);

/// Most recent samples of one pollutant, oldest first.
///
/// Samples are ordered by timestamp. Unparseable timestamps sit at the fetch
/// time, ordered among themselves by response position (newest first).
fn recent_ascending(
    samples: &[OpenAqSample],
    pollutant: Pollutant,
    fetched_at: DateTime<FixedOffset>,
) -> Vec<(SampleKey, f64)> {
    let mut keyed: Vec<(SampleKey, f64)> = samples
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, s)| s.parameter == pollutant)
        .map(|(index, s)| {
            let sequence = samples.len() - index;
            (sample_key(&s.timestamp_utc, sequence, fetched_at), s.value)
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);

    let skip = keyed.len().saturating_sub(MAX_OPENAQ_POINTS);
    keyed.split_off(skip)
}

fn normalize_generic(data: &GenericReading, fetched_at: DateTime<FixedOffset>) -> AirQualitySeries {
    let pm25 = valid(data.pm25);
    let pm10 = valid(data.pm10);

    if data.forecast_samples.is_empty() {
        return single_sample(pm25, pm10, fetched_at).with_current(pm25, pm10, data.aqi);
    }

    let samples = &data.forecast_samples[..data.forecast_samples.len().min(MAX_HOURLY_POINTS)];
    let labels = samples
        .iter()
        .zip(0i64..)
        .map(|(sample, index)| {
            sample
                .timestamp
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|at| at.with_timezone(fetched_at.offset()))
                .unwrap_or_else(|| fetched_at + TimeDelta::hours(index))
                .format(LABEL_FORMAT)
                .to_string()
        })
        .collect();
    let pm25_column: Vec<Option<f64>> = samples.iter().map(|s| s.pm25).collect();
    let pm10_column: Vec<Option<f64>> = samples.iter().map(|s| s.pm10).collect();

    AirQualitySeries::from_columns(labels, fill_gaps(&pm25_column), fill_gaps(&pm10_column))
        .with_current(pm25, pm10, data.aqi)
}

/// One point at the fetch time, or an empty series when neither value exists
fn single_sample(
    pm25: Option<f64>,
    pm10: Option<f64>,
    fetched_at: DateTime<FixedOffset>,
) -> AirQualitySeries {
    if pm25.is_none() && pm10.is_none() {
        return AirQualitySeries::default();
    }
    AirQualitySeries::from_columns(
        vec![fetched_at.format(LABEL_FORMAT).to_string()],
        vec![pm25.unwrap_or(0.0)],
        vec![pm10.unwrap_or(0.0)],
    )
}

/// Concentrations must be finite and non-negative
fn valid(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Sample-and-hold gap filling
fn fill_gaps(values: &[Option<f64>]) -> Vec<f64> {
    let Some(first) = values.iter().find_map(|v| valid(*v)) else {
        return vec![0.0; values.len()];
    };

    let mut held = first;
    values
        .iter()
        .map(|v| {
            if let Some(value) = valid(*v) {
                held = value;
            }
            held
        })
        .collect()
}

/// `HH:MM` label. Naive timestamps are already local to the city; absolute
/// ones are shown in the fetch offset; unparseable ones fall back to the fetch
/// time.
pub(crate) fn time_label(timestamp: &str, fetched_at: DateTime<FixedOffset>) -> String {
    if let Ok(at) = DateTime::parse_from_rfc3339(timestamp) {
        return at.with_timezone(fetched_at.offset()).format(LABEL_FORMAT).to_string();
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(timestamp, format).ok())
        .map_or_else(
            || fetched_at.format(LABEL_FORMAT).to_string(),
            |at| at.format(LABEL_FORMAT).to_string(),
        )
}

fn sample_key(timestamp: &str, sequence: usize, fetched_at: DateTime<FixedOffset>) -> SampleKey {
    DateTime::parse_from_rfc3339(timestamp).map_or_else(
        |_| (fetched_at.with_timezone(&Utc), sequence),
        |at| (at.with_timezone(&Utc), 0),
    )
}
