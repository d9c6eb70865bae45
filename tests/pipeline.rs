//! End-to-end dashboard cycles against canned provider responses

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde_json::{Value, json};

use citydash::http::HttpError;
use citydash::mock::MockHttpClient;
use citydash::models::Pollutant;
use citydash::{
    AqiLabel, Coordinates, DashboardConfig, DashboardSession, Location, LocationResolver,
    Provenance, SessionController, SessionEvent, us_aqi_from_concentration,
};

fn create_test_time() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-03-01T12:00:00+00:00").unwrap()
}

fn create_test_location() -> Location {
    Location::new(Coordinates::new(51.5074, -0.1278).unwrap(), "London".into())
}

fn server_error() -> HttpError {
    HttpError::Status {
        status: 500,
        body: "upstream unavailable".into(),
    }
}

fn waqi_unknown_station() -> Value {
    json!({"status": "error", "data": "Unknown station"})
}

fn open_meteo_weather() -> Value {
    json!({
        "current_weather": {"temperature": 31.5},
        "hourly": {
            "time": ["2024-03-01T12:00", "2024-03-01T13:00"],
            "temperature_2m": [31.0, 32.5],
            "relativehumidity_2m": [40.0, 38.0]
        }
    })
}

#[tokio::test]
async fn test_search_uses_first_provider_with_data() {
    let mock = Arc::new(
        MockHttpClient::new()
            .with_json(
                "nominatim.openstreetmap.org",
                json!([{"lat": "28.6138954", "lon": "77.2090057", "display_name": "Delhi, India"}]),
            )
            .with_json(
                "api.api-ninjas.com",
                json!({
                    "overall_aqi": 164,
                    "PM2.5": {"concentration": 78.4, "aqi": 164},
                    "PM10": {"concentration": 120.0, "aqi": 83}
                }),
            )
            .with_json("api.open-meteo.com/v1/forecast", open_meteo_weather()),
    );
    let mut config = DashboardConfig::default();
    config.providers.api_ninjas_key = Some("test-key".into());

    let session = DashboardSession::from_config(&config, mock.clone());
    let geocoder = Arc::new(LocationResolver::new(mock.clone()));
    let (controller, mut events) = SessionController::new(session, geocoder, false);

    controller.search("Delhi").await;

    let first = events.try_recv().unwrap();
    assert!(matches!(first, SessionEvent::Loading { .. }));
    let SessionEvent::Updated(snapshot) = events.try_recv().unwrap() else {
        panic!("expected a snapshot");
    };

    assert_eq!(snapshot.location.name, "Delhi");
    assert_eq!(snapshot.provenance, Some(Provenance::ApiNinjas));
    assert!(snapshot.failed_providers.is_empty());
    assert_eq!(snapshot.aqi.value, 164);
    assert_eq!(snapshot.aqi.label, AqiLabel::Unhealthy);
    assert_eq!(snapshot.air_quality.pm25, vec![78.4]);
    assert_eq!(snapshot.air_quality.pm10, vec![120.0]);
    assert_eq!(snapshot.hour_labels, vec!["12:00", "13:00"]);
    assert!(
        snapshot
            .insights
            .iter()
            .any(|i| i.text == "Unhealthy (AQI: 164) [API Ninjas (Live)]")
    );
    assert!(snapshot.insights.iter().any(|i| i.title == "Weather Note"));

    assert_eq!(mock.call_count("api.api-ninjas.com"), 1);
    assert_eq!(mock.call_count("api.waqi.info"), 0);
    assert_eq!(mock.call_count("api.openaq.org"), 0);
    let ninjas = mock
        .requests()
        .into_iter()
        .find(|r| r.url.contains("api-ninjas"))
        .unwrap();
    assert_eq!(
        ninjas.headers,
        vec![("X-Api-Key".to_string(), "test-key".to_string())]
    );
}

#[tokio::test]
async fn test_open_meteo_fallback_with_hourly_series() {
    let mock = Arc::new(
        MockHttpClient::new()
            .with_error("api.api-ninjas.com", server_error())
            .with_json("api.waqi.info", waqi_unknown_station())
            .with_json(
                "air-quality-api.open-meteo.com",
                json!({
                    "current": {"time": "2024-03-01T12:00", "us_aqi": 57, "european_aqi": 31, "pm2_5": 14.2, "pm10": 22.0},
                    "hourly": {
                        "time": ["2024-03-01T00:00", "2024-03-01T01:00", "2024-03-01T02:00"],
                        "pm2_5": [12.0, null, 16.5],
                        "pm10": [20.0, 21.0, null]
                    }
                }),
            ),
    );
    let session = DashboardSession::from_config(&DashboardConfig::default(), mock.clone());

    let snapshot = session
        .run_cycle_at(&create_test_location(), true, create_test_time())
        .await;

    assert_eq!(snapshot.provenance, Some(Provenance::OpenMeteo));
    assert_eq!(
        snapshot.failed_providers,
        vec![Provenance::ApiNinjas, Provenance::AqicnCity, Provenance::AqicnGeo]
    );
    assert_eq!(snapshot.air_quality.time_labels, vec!["00:00", "01:00", "02:00"]);
    assert_eq!(snapshot.air_quality.pm25, vec![12.0, 12.0, 16.5]);
    assert_eq!(snapshot.air_quality.pm10, vec![20.0, 21.0, 21.0]);
    assert_eq!(snapshot.aqi.value, 57);
    assert_eq!(snapshot.aqi.label, AqiLabel::Moderate);
    assert_eq!(mock.call_count("api.openaq.org"), 0);
}

#[tokio::test]
async fn test_openaq_is_last_resort() {
    let mock = Arc::new(
        MockHttpClient::new()
            .with_error("api.api-ninjas.com", server_error())
            .with_json("api.waqi.info", waqi_unknown_station())
            .with_error("air-quality-api.open-meteo.com", HttpError::Timeout)
            .with_json(
                "api.openaq.org",
                json!({"results": [
                    {"parameter": "pm25", "value": 35.4, "date": {"utc": "2024-03-01T10:00:00Z"}},
                    {"parameter": "pm10", "value": 54.0, "date": {"utc": "2024-03-01T10:00:00Z"}}
                ]}),
            ),
    );
    let session = DashboardSession::from_config(&DashboardConfig::default(), mock.clone());

    let snapshot = session
        .run_cycle_at(&create_test_location(), false, create_test_time())
        .await;

    assert_eq!(snapshot.provenance, Some(Provenance::OpenAq));
    assert_eq!(snapshot.failed_providers.len(), 4);
    assert_eq!(snapshot.air_quality.time_labels, vec!["10:00"]);
    assert_eq!(snapshot.air_quality.current_pm25, Some(35.4));
    assert_eq!(
        snapshot.aqi.value,
        us_aqi_from_concentration(35.4, Pollutant::Pm25).unwrap()
    );
    assert_eq!(snapshot.aqi.label, AqiLabel::Moderate);
}

#[tokio::test]
async fn test_unknown_city_reports_failure() {
    let mock = Arc::new(
        MockHttpClient::new()
            .with_json("nominatim.openstreetmap.org", json!([]))
            .with_json("geocoding-api.open-meteo.com", json!({"generationtime_ms": 0.3})),
    );
    let session = DashboardSession::from_config(&DashboardConfig::default(), mock.clone());
    let geocoder = Arc::new(LocationResolver::new(mock.clone()));
    let (controller, mut events) = SessionController::new(session, geocoder, false);

    controller.search("Xyzzyville").await;

    let _loading = events.try_recv().unwrap();
    let SessionEvent::Failed { message, panel } = events.try_recv().unwrap() else {
        panic!("expected a failure");
    };
    assert!(message.contains("Xyzzyville"));
    assert_eq!(panel[0].title, "Error");
    assert_eq!(panel[0].text, message);
    assert_eq!(panel[1].title, "Tip");
    assert!(panel[1].text.contains("\"Delhi\""));
    assert!(controller.target().is_none());
    assert_eq!(mock.call_count("air-quality-api"), 0);
}
