//! Weather forecast summaries for the profile biography.
//!
//! Fetches the 5-day/3-hour forecast, buckets entries into today and
//! tomorrow by the city's local calendar day, and reduces each bucket
//! to a (min, max, dominant status) summary. Responses are cached for a
//! configurable TTL so repeated biography builds stay cheap.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::debug;

use crate::config::WeatherConfig;
use crate::{AppError, Result};

/// Normalized weather condition vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherStatus {
    /// Thunderstorm.
    Stormy,
    /// Drizzle or rain.
    Rainy,
    /// Snow.
    Snowy,
    /// Clear sky.
    Sunny,
    /// Clouds.
    Cloudy,
    /// Mist or fog.
    Foggy,
    /// Squall.
    Windy,
    /// Smoke or haze.
    Hazy,
    /// Dust or sand.
    Dusty,
    /// Volcanic ash.
    Ashy,
    /// Tornado.
    Tornado,
    /// Anything the vocabulary does not cover.
    Unknown,
}

impl WeatherStatus {
    /// Map an API condition group to the normalized vocabulary.
    #[must_use]
    pub fn from_condition(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "thunderstorm" => Self::Stormy,
            "drizzle" | "rain" => Self::Rainy,
            "snow" => Self::Snowy,
            "clear" => Self::Sunny,
            "clouds" => Self::Cloudy,
            "mist" | "fog" => Self::Foggy,
            "squall" => Self::Windy,
            "smoke" | "haze" => Self::Hazy,
            "dust" | "sand" => Self::Dusty,
            "ash" => Self::Ashy,
            "tornado" => Self::Tornado,
            _ => Self::Unknown,
        }
    }

    /// Emoji rendered in the biography for this status.
    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Stormy => "⛈️",
            Self::Rainy => "🌧️",
            Self::Snowy => "❄️",
            Self::Sunny => "☀️",
            Self::Cloudy => "☁️",
            Self::Foggy => "🌫️",
            Self::Windy => "💨",
            Self::Hazy => "🌁",
            Self::Dusty | Self::Tornado => "🌪️",
            Self::Ashy => "🌋",
            Self::Unknown => "❔",
        }
    }
}

/// Reduced forecast for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaySummary {
    /// Lowest forecast temperature.
    pub min_temp: f64,
    /// Highest forecast temperature.
    pub max_temp: f64,
    /// Most frequent condition across the day's entries.
    pub status: WeatherStatus,
}

/// Summaries for today and tomorrow; either may be absent when the
/// forecast window does not cover the day.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForecastSummary {
    /// Today's summary.
    pub today: Option<DaySummary>,
    /// Tomorrow's summary.
    pub tomorrow: Option<DaySummary>,
}

/// One 3-hour forecast entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastEntry {
    /// Entry timestamp, seconds since the epoch (UTC).
    pub dt: i64,
    /// Temperature readings.
    #[serde(default)]
    pub main: MainReadings,
    /// Condition list; the first entry is the primary condition.
    #[serde(default)]
    pub weather: Vec<Condition>,
}

/// Temperature block of a forecast entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MainReadings {
    /// Minimum temperature for the entry.
    #[serde(default)]
    pub temp_min: Option<f64>,
    /// Maximum temperature for the entry.
    #[serde(default)]
    pub temp_max: Option<f64>,
}

/// One weather condition.
#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    /// Condition group name (e.g. "Rain", "Clouds").
    #[serde(default)]
    pub main: Option<String>,
}

/// Forecast API response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    /// Forecast entries in chronological order.
    #[serde(default)]
    pub list: Vec<ForecastEntry>,
    /// City metadata.
    #[serde(default)]
    pub city: Option<CityInfo>,
}

/// City metadata of a forecast response.
#[derive(Debug, Clone, Deserialize)]
pub struct CityInfo {
    /// Shift from UTC of the city's local time, in seconds.
    #[serde(default)]
    pub timezone: i64,
}

/// Reduce a day's entries to a summary; `None` when the bucket is empty
/// or carries no usable temperatures.
#[must_use]
pub fn summarize_entries(entries: &[ForecastEntry]) -> Option<DaySummary> {
    let mut min_temp = f64::INFINITY;
    let mut max_temp = f64::NEG_INFINITY;
    let mut status_counts: Vec<(WeatherStatus, u32)> = Vec::new();

    for entry in entries {
        if let Some(temp) = entry.main.temp_min {
            min_temp = min_temp.min(temp);
        }
        if let Some(temp) = entry.main.temp_max {
            max_temp = max_temp.max(temp);
        }
        if let Some(primary) = entry.weather.first().and_then(|c| c.main.as_deref()) {
            let status = WeatherStatus::from_condition(primary);
            match status_counts.iter_mut().find(|(s, _)| *s == status) {
                Some((_, count)) => *count += 1,
                None => status_counts.push((status, 1)),
            }
        }
    }

    if !min_temp.is_finite() || !max_temp.is_finite() {
        return None;
    }

    let status = status_counts
        .iter()
        .max_by_key(|(_, count)| *count)
        .map_or(WeatherStatus::Unknown, |(status, _)| *status);

    Some(DaySummary {
        min_temp,
        max_temp,
        status,
    })
}

/// Bucket forecast entries into today and tomorrow by the city's local
/// calendar day and summarize each bucket.
#[must_use]
pub fn summarize_forecast(response: &ForecastResponse, now_utc: i64) -> ForecastSummary {
    let timezone_offset = response.city.as_ref().map_or(0, |city| city.timezone);
    let Some(today_key) = local_date(now_utc, timezone_offset) else {
        return ForecastSummary::default();
    };
    let Some(tomorrow_key) = local_date(now_utc + 86_400, timezone_offset) else {
        return ForecastSummary::default();
    };

    let mut today_entries = Vec::new();
    let mut tomorrow_entries = Vec::new();
    for entry in &response.list {
        match local_date(entry.dt, timezone_offset) {
            Some(key) if key == today_key => today_entries.push(entry.clone()),
            Some(key) if key == tomorrow_key => tomorrow_entries.push(entry.clone()),
            _ => {}
        }
    }

    ForecastSummary {
        today: summarize_entries(&today_entries),
        tomorrow: summarize_entries(&tomorrow_entries),
    }
}

fn local_date(unix_seconds: i64, timezone_offset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(unix_seconds + timezone_offset, 0).map(|dt| dt.date_naive())
}

/// Forecast client with a TTL cache.
pub struct WeatherService {
    http: reqwest::Client,
    config: WeatherConfig,
    cache: Option<(Instant, ForecastSummary)>,
}

impl WeatherService {
    /// Build a service from weather configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` if the HTTP client cannot be
    /// constructed.
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|err| AppError::Http(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            config,
            cache: None,
        })
    }

    /// Fetch (or serve from cache) the forecast summary.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` on transport failure or a rejected
    /// request.
    pub async fn forecast_summary(&mut self) -> Result<ForecastSummary> {
        let ttl = std::time::Duration::from_secs(self.config.cache_ttl_seconds);
        if let Some((fetched_at, cached)) = self.cache {
            if fetched_at.elapsed() < ttl {
                debug!("serving forecast summary from cache");
                return Ok(cached);
            }
        }

        let url = format!("{}/data/2.5/forecast", self.config.api_base);
        let response = self
            .http
            .get(url)
            .query(&[
                ("lat", self.config.lat.to_string()),
                ("lon", self.config.lon.to_string()),
                ("appid", self.config.api_key.clone()),
                ("units", self.config.units.clone()),
                ("lang", self.config.lang.clone()),
            ])
            .send()
            .await
            .map_err(|err| AppError::Http(format!("weather request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Http(format!(
                "weather request failed ({status}): {body}"
            )));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|err| AppError::Http(format!("invalid weather response: {err}")))?;

        let summary = summarize_forecast(&body, chrono::Utc::now().timestamp());
        self.cache = Some((Instant::now(), summary));
        Ok(summary)
    }
}
