//! Profile biography and photo updates.
//!
//! Runs after a successful authentication: composes the biography
//! (quote, location/date header, weather lines) and uploads the
//! configured profile photo. Everything but the biography submission is
//! best effort.

use chrono::Local;
use tracing::{info, warn};

use crate::config::ProfileConfig;
use crate::platform::PlatformClient;
use crate::weather::{DaySummary, ForecastSummary, WeatherService, WeatherStatus};
use crate::Result;

/// Pick a quote from the pool.
///
/// Selection only needs to vary between runs, so it keys off the clock
/// instead of carrying an RNG dependency.
#[must_use]
pub fn pick_quote(quotes: &[String]) -> &str {
    if quotes.is_empty() {
        return "";
    }
    let millis = Local::now().timestamp_millis().unsigned_abs();
    let index = usize::try_from(millis % quotes.len() as u64).unwrap_or(0);
    &quotes[index]
}

fn format_temp(value: f64) -> String {
    format!("{}°", value.round())
}

/// Render one biography weather line; `--` placeholders when the
/// summary is absent.
#[must_use]
pub fn format_weather_line(label: &str, summary: Option<&DaySummary>) -> String {
    match summary {
        Some(summary) => format!(
            "| {label} {} / {} {} |",
            format_temp(summary.max_temp),
            format_temp(summary.min_temp),
            summary.status.emoji()
        ),
        None => format!("| {label} -- / -- {} |", WeatherStatus::Unknown.emoji()),
    }
}

/// Compose the full biography text.
#[must_use]
pub fn compose_biography(
    quote: &str,
    location_label: &str,
    date_label: &str,
    summary: Option<&ForecastSummary>,
) -> String {
    let today_line = format_weather_line("Today", summary.and_then(|s| s.today.as_ref()));
    let tomorrow_line = format_weather_line("Tomorrow", summary.and_then(|s| s.tomorrow.as_ref()));
    format!("{quote}\n+-----📍{location_label} {date_label}📍-----+\n{today_line}\n{tomorrow_line}")
}

/// Applies the biography and photo updates through the platform client.
pub struct ProfileUpdater<'a> {
    platform: &'a dyn PlatformClient,
    weather: Option<WeatherService>,
    config: &'a ProfileConfig,
}

impl<'a> ProfileUpdater<'a> {
    /// Create an updater; `weather` is `None` when the weather service
    /// is not configured.
    #[must_use]
    pub fn new(
        platform: &'a dyn PlatformClient,
        weather: Option<WeatherService>,
        config: &'a ProfileConfig,
    ) -> Self {
        Self {
            platform,
            weather,
            config,
        }
    }

    /// Update the biography and, best effort, the profile photo.
    ///
    /// # Errors
    ///
    /// Returns an error only when the biography submission itself fails;
    /// weather and photo failures are logged and skipped.
    pub async fn update(&mut self) -> Result<()> {
        let summary = match self.weather.as_mut() {
            Some(service) => match service.forecast_summary().await {
                Ok(summary) => Some(summary),
                Err(err) => {
                    warn!(%err, "weather summary unavailable");
                    None
                }
            },
            None => None,
        };

        let quote = pick_quote(&self.config.quotes);
        let date_label = Local::now().format("%d/%m").to_string();
        let biography = compose_biography(
            quote,
            &self.config.location_label,
            &date_label,
            summary.as_ref(),
        );
        self.platform.set_biography(&biography).await?;
        info!("biography updated");

        self.update_photo().await;
        Ok(())
    }

    async fn update_photo(&self) {
        let Some(path) = self.config.photo_path.as_ref() else {
            return;
        };
        let image = match tokio::fs::read(path).await {
            Ok(image) => image,
            Err(err) => {
                warn!(%err, path = %path.display(), "unable to read profile photo");
                return;
            }
        };
        match self.platform.change_profile_picture(image).await {
            Ok(()) => info!(path = %path.display(), "profile photo updated"),
            Err(err) => warn!(%err, "failed to update profile photo"),
        }
    }
}
