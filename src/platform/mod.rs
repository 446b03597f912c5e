//! Platform client abstraction.
//!
//! [`PlatformClient`] decouples the login orchestration core from the
//! platform wire protocol. Implementations return boxed futures so the
//! trait stays object-safe and the core can hold an `Arc<dyn PlatformClient>`
//! while tests substitute scripted fakes.

pub mod http;

use std::future::Future;
use std::pin::Pin;

use crate::models::checkpoint::{ChallengeResponse, ChallengeState, Checkpoint};
use crate::models::identity::Identity;
use crate::models::session::Session;
use crate::Result;

/// Boxed future returned by [`PlatformClient`] methods.
pub type PlatformFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Narrow interface to the session-based platform.
pub trait PlatformClient: Send + Sync {
    /// Opaque pre-login behavioral fingerprint step.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`](crate::AppError::Http) or
    /// [`AppError::Platform`](crate::AppError::Platform) if the call fails.
    fn pre_login_flow(&self) -> PlatformFuture<'_, ()>;

    /// Opaque post-login fingerprint step, launched detached after a
    /// successful login.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`](crate::AppError::Http) or
    /// [`AppError::Platform`](crate::AppError::Platform) if the call fails.
    fn post_login_flow(&self) -> PlatformFuture<'_, ()>;

    /// Authenticate with username and password.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CheckpointRequired`](crate::AppError::CheckpointRequired)
    /// when the platform holds the login for verification, and
    /// [`AppError::Platform`](crate::AppError::Platform) for any other
    /// rejection.
    fn login<'a>(&'a self, username: &'a str, password: &'a str) -> PlatformFuture<'a, Identity>;

    /// Look up the currently authenticated user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Auth`](crate::AppError::Auth) when the stored
    /// session is expired or invalid.
    fn current_user(&self) -> PlatformFuture<'_, Identity>;

    /// Ask the platform to initiate the checkpoint's challenge
    /// automatically.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoCheckpoint`](crate::AppError::NoCheckpoint)
    /// when the platform reports no active checkpoint.
    fn challenge_auto<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
    ) -> PlatformFuture<'a, ChallengeState>;

    /// Fetch the checkpoint's current challenge state.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoCheckpoint`](crate::AppError::NoCheckpoint)
    /// when the platform reports no active checkpoint.
    fn challenge_state<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
    ) -> PlatformFuture<'a, ChallengeState>;

    /// Submit the chosen verification method.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Platform`](crate::AppError::Platform) if the
    /// submission is rejected.
    fn select_verify_method<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
        value: &'a str,
    ) -> PlatformFuture<'a, ChallengeState>;

    /// Submit the login review approval token.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Platform`](crate::AppError::Platform) if the
    /// submission is rejected.
    fn delta_login_review<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
        token: &'a str,
    ) -> PlatformFuture<'a, ChallengeState>;

    /// Submit the operator-provided security code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Platform`](crate::AppError::Platform) if the
    /// submission is rejected.
    fn send_security_code<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
        code: &'a str,
    ) -> PlatformFuture<'a, ChallengeResponse>;

    /// Replace the profile biography text.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Platform`](crate::AppError::Platform) if the
    /// update is rejected.
    fn set_biography<'a>(&'a self, text: &'a str) -> PlatformFuture<'a, ()>;

    /// Replace the profile photo.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Platform`](crate::AppError::Platform) if the
    /// upload is rejected.
    fn change_profile_picture(&self, image: Vec<u8>) -> PlatformFuture<'_, ()>;

    /// Serialize the client's session state into an opaque blob.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Session`](crate::AppError::Session) if there is
    /// no authenticated state to export.
    fn export_session(&self) -> PlatformFuture<'_, Session>;

    /// Restore previously exported session state.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Session`](crate::AppError::Session) if the blob
    /// is not one this client produced.
    fn restore_session<'a>(&'a self, session: &'a Session) -> PlatformFuture<'a, ()>;
}
