//! Error types shared across the application.

use std::fmt::{Display, Formatter};

use crate::models::checkpoint::Checkpoint;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Transport failure talking to an external HTTP service.
    Http(String),
    /// Platform API rejected a call.
    Platform(String),
    /// Platform rejected the stored authentication (expired session).
    Auth(String),
    /// Login was held for checkpoint verification. Retryable signal: the
    /// orchestrator delegates it to challenge resolution.
    CheckpointRequired(Box<Checkpoint>),
    /// The platform reports no active checkpoint for a challenge call.
    NoCheckpoint,
    /// Checkpoint payload is missing the challenge details.
    MalformedCheckpoint(String),
    /// The challenge flow reached a step that cannot be automated.
    FlowStalled(String),
    /// The login attempt budget was consumed.
    AttemptsExhausted(u32),
    /// The operator requested cancellation through the stop vocabulary.
    StopRequested,
    /// Confirmation channel failure (remote delivery or local prompt).
    Confirm(String),
    /// Persisted session blob could not be restored.
    Session(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Platform(msg) => write!(f, "platform: {msg}"),
            Self::Auth(msg) => write!(f, "auth: {msg}"),
            Self::CheckpointRequired(checkpoint) => {
                write!(f, "checkpoint required: {}", checkpoint.describe_url())
            }
            Self::NoCheckpoint => write!(f, "no active checkpoint"),
            Self::MalformedCheckpoint(msg) => write!(f, "malformed checkpoint: {msg}"),
            Self::FlowStalled(msg) => write!(f, "automation flow stalled: {msg}"),
            Self::AttemptsExhausted(max) => {
                write!(f, "exceeded maximum login attempts ({max})")
            }
            Self::StopRequested => write!(f, "stop requested by operator"),
            Self::Confirm(msg) => write!(f, "confirm: {msg}"),
            Self::Session(msg) => write!(f, "session: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
