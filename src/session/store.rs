//! Persisted session blob storage and validation.

use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::models::identity::Identity;
use crate::models::session::Session;
use crate::platform::PlatformClient;
use crate::{AppError, Result};

/// Loads and saves the opaque session blob at a fixed path.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Create a store for the given blob path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the persisted session, if a usable one exists.
    ///
    /// A missing file and corrupt content both yield `None`; neither is
    /// an error.
    pub async fn load(&self) -> Option<Session> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no saved session found; proceeding with login");
                return None;
            }
            Err(err) => {
                warn!(%err, "failed to read saved session; proceeding with login");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                info!(path = %self.path.display(), "loaded saved session");
                Some(session)
            }
            Err(err) => {
                warn!(%err, "saved session is corrupt; proceeding with login");
                None
            }
        }
    }

    /// Persist the session blob, best effort.
    ///
    /// Failures are logged and never surfaced to the caller.
    pub async fn save(&self, session: &Session) {
        let serialized = match serde_json::to_string(session) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(%err, "unable to serialize session state");
                return;
            }
        };
        match tokio::fs::write(&self.path, serialized).await {
            Ok(()) => info!(path = %self.path.display(), "saved session"),
            Err(err) => warn!(%err, "unable to persist session state"),
        }
    }

    /// Check whether the restored session is still usable by looking up
    /// the current user.
    ///
    /// `Ok(Some(identity))` means the session can be reused; `Ok(None)`
    /// means a fresh login is needed.
    ///
    /// # Errors
    ///
    /// Propagates transport and programming errors; an authentication
    /// rejection or API-level validation failure is not fatal.
    pub async fn validate(&self, platform: &dyn PlatformClient) -> Result<Option<Identity>> {
        match platform.current_user().await {
            Ok(identity) => Ok(Some(identity)),
            Err(AppError::Auth(_)) => {
                info!("stored session expired; logging in again");
                Ok(None)
            }
            Err(AppError::Platform(err)) => {
                warn!(%err, "session validation failed; logging in again");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
