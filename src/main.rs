#![forbid(unsafe_code)]

//! `doorman` — checkpoint-aware platform login binary.
//!
//! Bootstraps configuration, authenticates (reusing a persisted session
//! when it is still valid), resolves login checkpoints with the
//! operator in the loop, then refreshes the profile biography and
//! photo.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use doorman::config::GlobalConfig;
use doorman::confirm::{ConfirmationChannel, Confirmer};
use doorman::login::orchestrator::{spawn_post_login_flow, LoginOrchestrator};
use doorman::models::identity::Identity;
use doorman::platform::http::HttpPlatformClient;
use doorman::platform::PlatformClient;
use doorman::profile::ProfileUpdater;
use doorman::session::store::SessionStore;
use doorman::weather::WeatherService;
use doorman::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "doorman", about = "Checkpoint-aware platform login automation", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("failed to init tracing: {err}");
        std::process::exit(1);
    }
    info!("doorman bootstrap");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to build tokio runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run(args)) {
        error!(%err, "login failed");
        eprintln!("login failed: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration and secrets ──────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.load_credentials().await?;
    info!("configuration loaded");

    let platform: Arc<dyn PlatformClient> = Arc::new(HttpPlatformClient::new(&config.platform)?);
    let mut channel = ConfirmationChannel::from_config(&config);
    let store = SessionStore::new(config.session.state_path.clone());

    let outcome = authenticate(&config, &platform, &mut channel, &store).await;
    match outcome {
        Ok(identity) => {
            update_profile(&config, platform.as_ref()).await?;
            info!(username = %identity.username, "done");
            Ok(())
        }
        Err(err) => {
            if matches!(err, AppError::StopRequested) {
                // Acknowledge the cancellation before exiting non-zero.
                if let Err(notify_err) = channel.notify("Automation stopped as requested.").await {
                    warn!(%notify_err, "failed to acknowledge stop");
                }
            }
            Err(err)
        }
    }
}

/// Reuse a persisted session when it validates; otherwise run the login
/// orchestrator. The session blob is written only after either path
/// fully succeeds.
async fn authenticate(
    config: &GlobalConfig,
    platform: &Arc<dyn PlatformClient>,
    channel: &mut ConfirmationChannel,
    store: &SessionStore,
) -> Result<Identity> {
    if let Some(session) = store.load().await {
        match platform.restore_session(&session).await {
            Ok(()) => {
                if let Some(identity) = store.validate(platform.as_ref()).await? {
                    info!(username = %identity.username, "reusing existing session");
                    spawn_post_login_flow(platform);
                    persist_session(store, platform).await;
                    return Ok(identity);
                }
            }
            Err(err) => {
                warn!(%err, "failed to restore saved session; proceeding with login");
            }
        }
    }

    let identity = LoginOrchestrator::new(Arc::clone(platform), channel, config)
        .login()
        .await?;
    persist_session(store, platform).await;
    Ok(identity)
}

async fn persist_session(store: &SessionStore, platform: &Arc<dyn PlatformClient>) {
    match platform.export_session().await {
        Ok(session) => store.save(&session).await,
        Err(err) => warn!(%err, "unable to export session state"),
    }
}

async fn update_profile(config: &GlobalConfig, platform: &dyn PlatformClient) -> Result<()> {
    let weather = match &config.weather {
        Some(weather_config) => Some(WeatherService::new(weather_config.clone())?),
        None => None,
    };
    ProfileUpdater::new(platform, weather, &config.profile)
        .update()
        .await
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
