//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keyring service name used for secret lookups.
const KEYRING_SERVICE: &str = "doorman";

/// Platform connectivity settings.
///
/// The account password is loaded at runtime via OS keychain or
/// environment variable, never from the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct PlatformConfig {
    /// Base URL of the platform API.
    pub base_url: String,
    /// Account username to authenticate as.
    pub username: String,
    /// User-agent header presented to the platform.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Optional proxy URL (http, https, or socks5) for platform calls.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Account password (populated at runtime).
    #[serde(skip)]
    pub password: String,
}

/// Persisted session settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Path of the persisted session blob.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
        }
    }
}

/// Remote confirmation backend settings.
///
/// Both `chat_id` and the bot token (loaded at runtime) must be present
/// to activate the backend; otherwise confirmations fall back to the
/// local prompt.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TelegramConfig {
    /// Conversation the bot listens to and posts into.
    #[serde(default)]
    pub chat_id: Option<i64>,
    /// Telegram Bot API base URL.
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Bot credential (populated at runtime).
    #[serde(skip)]
    pub bot_token: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            chat_id: None,
            api_base: default_telegram_api_base(),
            bot_token: String::new(),
        }
    }
}

/// Login retry budget.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LoginConfig {
    /// Maximum login attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Configurable timeout values (seconds) for confirmation waits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Overall wait for a qualifying operator reply.
    #[serde(default = "default_confirmation_wait_seconds")]
    pub confirmation_wait_seconds: u64,
    /// Server-side long-poll bound for one update cycle.
    #[serde(default = "default_poll_cycle_seconds")]
    pub poll_cycle_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            confirmation_wait_seconds: default_confirmation_wait_seconds(),
            poll_cycle_seconds: default_poll_cycle_seconds(),
        }
    }
}

/// Weather summary settings for the profile biography.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct WeatherConfig {
    /// Forecast latitude.
    pub lat: f64,
    /// Forecast longitude.
    pub lon: f64,
    /// Unit system passed to the weather API.
    #[serde(default = "default_weather_units")]
    pub units: String,
    /// Language passed to the weather API.
    #[serde(default = "default_weather_lang")]
    pub lang: String,
    /// How long a fetched forecast summary stays fresh.
    #[serde(default = "default_weather_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Weather API base URL.
    #[serde(default = "default_weather_api_base")]
    pub api_base: String,
    /// Weather API key (populated at runtime).
    #[serde(skip)]
    pub api_key: String,
}

/// Profile update settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ProfileConfig {
    /// Location label rendered in the biography header.
    #[serde(default = "default_location_label")]
    pub location_label: String,
    /// Image file uploaded as the profile photo after login, if set.
    #[serde(default)]
    pub photo_path: Option<PathBuf>,
    /// Quote pool for the biography's first line.
    #[serde(default = "default_quotes")]
    pub quotes: Vec<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            location_label: default_location_label(),
            photo_path: None,
            quotes: default_quotes(),
        }
    }
}

fn default_user_agent() -> String {
    format!("doorman/{}", env!("CARGO_PKG_VERSION"))
}

fn default_state_path() -> PathBuf {
    PathBuf::from("state.json")
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".into()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_confirmation_wait_seconds() -> u64 {
    600
}

fn default_poll_cycle_seconds() -> u64 {
    25
}

fn default_weather_units() -> String {
    "metric".into()
}

fn default_weather_lang() -> String {
    "en".into()
}

fn default_weather_cache_ttl() -> u64 {
    900
}

fn default_weather_api_base() -> String {
    "https://api.openweathermap.org".into()
}

fn default_location_label() -> String {
    "Madrid".into()
}

fn default_quotes() -> Vec<String> {
    [
        "You can't stop the future",
        "We don't think about what the future will be, we create it",
        "Bringing the future closer to the present",
        "The future isn't something to wait for, it's something to build",
        "We don't dream about tomorrow, we design it today",
        "Transforming ideas into the future we imagine",
        "The future begins the moment we decide to create it",
        "Making possible what doesn't exist yet",
        "Every step we take redefines tomorrow",
        "Connecting the present with the future",
        "Innovating today for a better tomorrow",
        "The future is closer than you think",
        "The limit isn't tomorrow, it's not trying today",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

/// Global configuration parsed from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Platform connectivity settings.
    pub platform: PlatformConfig,
    /// Persisted session settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Remote confirmation backend settings.
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Login retry budget.
    #[serde(default)]
    pub login: LoginConfig,
    /// Confirmation wait timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Weather summary settings; absent disables the weather lines.
    #[serde(default)]
    pub weather: Option<WeatherConfig>,
    /// Profile update settings.
    #[serde(default)]
    pub profile: ProfileConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load secrets from OS keychain with env-var fallback.
    ///
    /// The platform password is required. The Telegram bot token and the
    /// weather API key are optional: when unavailable the corresponding
    /// feature is disabled with a warning.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env var provides
    /// the platform password.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.platform.password = load_credential("platform_password", "DOORMAN_PASSWORD").await?;

        if self.telegram.chat_id.is_some() {
            match load_credential("telegram_bot_token", "TELEGRAM_BOT_TOKEN").await {
                Ok(token) => self.telegram.bot_token = token,
                Err(err) => {
                    warn!(%err, "telegram bot token unavailable; remote confirmations disabled");
                }
            }
        }

        if self.weather.is_some() {
            match load_credential("openweather_api_key", "OPENWEATHER_API_KEY").await {
                Ok(key) => {
                    if let Some(weather) = self.weather.as_mut() {
                        weather.api_key = key;
                    }
                }
                Err(err) => {
                    warn!(%err, "weather api key unavailable; weather lines disabled");
                    self.weather = None;
                }
            }
        }

        Ok(())
    }

    /// Whether the remote confirmation backend is fully configured.
    #[must_use]
    pub fn telegram_enabled(&self) -> bool {
        self.telegram.chat_id.is_some() && !self.telegram.bot_token.is_empty()
    }

    fn validate(&mut self) -> Result<()> {
        if self.platform.base_url.trim().is_empty() {
            return Err(AppError::Config("platform.base_url must be set".into()));
        }
        while self.platform.base_url.ends_with('/') {
            self.platform.base_url.pop();
        }

        if self.platform.username.trim().is_empty() {
            return Err(AppError::Config("platform.username must be set".into()));
        }

        if self.login.max_attempts == 0 {
            return Err(AppError::Config(
                "login.max_attempts must be greater than zero".into(),
            ));
        }

        if self.timeouts.poll_cycle_seconds == 0 {
            return Err(AppError::Config(
                "timeouts.poll_cycle_seconds must be greater than zero".into(),
            ));
        }

        while self.telegram.api_base.ends_with('/') {
            self.telegram.api_base.pop();
        }
        if let Some(weather) = self.weather.as_mut() {
            while weather.api_base.ends_with('/') {
                weather.api_base.pop();
            }
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // Try OS keychain first via spawn_blocking (keyring is synchronous I/O).
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    // Fallback to environment variable.
    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
