use serde_json::json;

use doorman::weather::{
    summarize_entries, summarize_forecast, ForecastEntry, ForecastResponse, WeatherStatus,
};

fn entry(dt: i64, temp_min: f64, temp_max: f64, condition: &str) -> ForecastEntry {
    serde_json::from_value(json!({
        "dt": dt,
        "main": { "temp_min": temp_min, "temp_max": temp_max },
        "weather": [{ "main": condition }],
    }))
    .expect("entry parses")
}

#[test]
fn condition_mapping_covers_the_vocabulary() {
    assert_eq!(WeatherStatus::from_condition("Clear"), WeatherStatus::Sunny);
    assert_eq!(WeatherStatus::from_condition("rain"), WeatherStatus::Rainy);
    assert_eq!(
        WeatherStatus::from_condition("Drizzle"),
        WeatherStatus::Rainy
    );
    assert_eq!(
        WeatherStatus::from_condition("Thunderstorm"),
        WeatherStatus::Stormy
    );
    assert_eq!(WeatherStatus::from_condition("Mist"), WeatherStatus::Foggy);
    assert_eq!(
        WeatherStatus::from_condition("meteor shower"),
        WeatherStatus::Unknown
    );
}

#[test]
fn summarize_picks_extremes_and_dominant_status() {
    let entries = vec![
        entry(0, 10.0, 14.0, "Clouds"),
        entry(1, 8.0, 12.0, "Rain"),
        entry(2, 9.0, 17.0, "Rain"),
    ];

    let summary = summarize_entries(&entries).expect("summary");
    assert!((summary.min_temp - 8.0).abs() < f64::EPSILON);
    assert!((summary.max_temp - 17.0).abs() < f64::EPSILON);
    assert_eq!(summary.status, WeatherStatus::Rainy);
}

#[test]
fn summarize_empty_entries_is_none() {
    assert!(summarize_entries(&[]).is_none());
}

#[test]
fn summarize_without_temperatures_is_none() {
    let entries: Vec<ForecastEntry> = vec![serde_json::from_value(json!({
        "dt": 0,
        "weather": [{ "main": "Clear" }],
    }))
    .expect("entry parses")];
    assert!(summarize_entries(&entries).is_none());
}

#[test]
fn forecast_buckets_by_local_day() {
    // Noon UTC; city at UTC+0 keeps the buckets aligned with UTC days.
    let now = 1_700_000_000_i64 - (1_700_000_000_i64 % 86_400) + 43_200;
    let response: ForecastResponse = serde_json::from_value(json!({
        "city": { "timezone": 0 },
        "list": [
            { "dt": now + 3_600, "main": { "temp_min": 5.0, "temp_max": 9.0 },
              "weather": [{ "main": "Clear" }] },
            { "dt": now + 86_400, "main": { "temp_min": 1.0, "temp_max": 4.0 },
              "weather": [{ "main": "Snow" }] },
            // Two days out: belongs to neither bucket.
            { "dt": now + 2 * 86_400, "main": { "temp_min": 20.0, "temp_max": 30.0 },
              "weather": [{ "main": "Clear" }] },
        ],
    }))
    .expect("forecast parses");

    let summary = summarize_forecast(&response, now);
    let today = summary.today.expect("today summarized");
    let tomorrow = summary.tomorrow.expect("tomorrow summarized");

    assert_eq!(today.status, WeatherStatus::Sunny);
    assert!((today.max_temp - 9.0).abs() < f64::EPSILON);
    assert_eq!(tomorrow.status, WeatherStatus::Snowy);
    assert!((tomorrow.min_temp - 1.0).abs() < f64::EPSILON);
}

#[test]
fn timezone_offset_can_move_an_entry_into_tomorrow() {
    // 23:30 local at UTC+0 is already tomorrow at UTC+1.
    let midnight = 1_700_000_000_i64 - (1_700_000_000_i64 % 86_400);
    let now = midnight + 43_200;
    let late_entry_dt = midnight + 86_400 - 1_800;

    let response: ForecastResponse = serde_json::from_value(json!({
        "city": { "timezone": 3_600 },
        "list": [
            { "dt": late_entry_dt, "main": { "temp_min": 2.0, "temp_max": 3.0 },
              "weather": [{ "main": "Clouds" }] },
        ],
    }))
    .expect("forecast parses");

    let summary = summarize_forecast(&response, now);
    assert!(summary.today.is_none());
    assert!(summary.tomorrow.is_some());
}

#[test]
fn missing_city_defaults_to_utc() {
    let now = 1_700_000_000_i64;
    let response: ForecastResponse = serde_json::from_value(json!({
        "list": [
            { "dt": now, "main": { "temp_min": 5.0, "temp_max": 9.0 },
              "weather": [{ "main": "Clear" }] },
        ],
    }))
    .expect("forecast parses");

    assert!(summarize_forecast(&response, now).today.is_some());
}
