//! Bounded login retry loop with checkpoint delegation.
//!
//! Retries are expressed as an explicit iterative loop over an attempt
//! counter, never recursion. Manual (operator-mediated) completions
//! retry with the same attempt number so wait time alone cannot exhaust
//! the budget.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::GlobalConfig;
use crate::confirm::{evaluate, Confirmer};
use crate::login::challenge::{ChallengeOutcome, ChallengeResolver};
use crate::models::identity::Identity;
use crate::platform::PlatformClient;
use crate::{AppError, Result};

/// Launch the opaque post-login fingerprint flow detached.
///
/// The task is never joined into the success path; its failure is only
/// logged.
pub fn spawn_post_login_flow(platform: &Arc<dyn PlatformClient>) {
    let platform = Arc::clone(platform);
    tokio::spawn(async move {
        if let Err(err) = platform.post_login_flow().await {
            warn!(%err, "post-login flow failed");
        }
    });
}

/// Top-level login retry state machine.
pub struct LoginOrchestrator<'a> {
    platform: Arc<dyn PlatformClient>,
    channel: &'a mut dyn Confirmer,
    username: String,
    password: String,
    max_attempts: u32,
    confirmation_timeout: Duration,
}

impl<'a> LoginOrchestrator<'a> {
    /// Create an orchestrator over the given platform and channel.
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        channel: &'a mut dyn Confirmer,
        config: &GlobalConfig,
    ) -> Self {
        Self {
            platform,
            channel,
            username: config.platform.username.clone(),
            password: config.platform.password.clone(),
            max_attempts: config.login.max_attempts,
            confirmation_timeout: Duration::from_secs(config.timeouts.confirmation_wait_seconds),
        }
    }

    /// Authenticate, resolving any checkpoints the platform interposes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AttemptsExhausted`] once the attempt budget
    /// is spent, [`AppError::MalformedCheckpoint`] for a checkpoint
    /// without challenge details, [`AppError::StopRequested`] on
    /// operator cancellation, and any platform error not recognized as
    /// a checkpoint.
    pub async fn login(&mut self) -> Result<Identity> {
        let mut attempt: u32 = 1;
        loop {
            if attempt > self.max_attempts {
                return Err(AppError::AttemptsExhausted(self.max_attempts));
            }

            let span = info_span!("login_attempt", attempt);
            let attempt_result = self.attempt_login(attempt).instrument(span).await;
            match attempt_result {
                Ok(identity) => {
                    info!(username = %identity.username, "logged in");
                    spawn_post_login_flow(&self.platform);
                    return Ok(identity);
                }
                Err(AppError::CheckpointRequired(checkpoint)) => {
                    info!("checkpoint required; attempting automatic resolution");
                    debug!(payload = %checkpoint.raw, "raw checkpoint payload");

                    self.channel.alert(format!(
                        "⚠️ Checkpoint hold for {}.\nChallenge: {}",
                        self.username,
                        checkpoint.describe_url()
                    ));

                    if checkpoint.api_path.is_none() {
                        return Err(AppError::MalformedCheckpoint(
                            "platform returned a checkpoint without challenge details".into(),
                        ));
                    }

                    let outcome = ChallengeResolver::new(
                        self.platform.as_ref(),
                        &mut *self.channel,
                        self.confirmation_timeout,
                    )
                    .resolve(&checkpoint)
                    .await?;

                    match outcome {
                        ChallengeOutcome::Retry => attempt += 1,
                        ChallengeOutcome::ManualPending => {
                            // Same attempt: operator wait time must not
                            // consume the retry budget.
                            self.confirm_manual_completion(checkpoint.describe_url())
                                .await?;
                        }
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt_login(&self, attempt: u32) -> Result<Identity> {
        if attempt == 1 {
            self.platform.pre_login_flow().await?;
        }
        self.platform.login(&self.username, &self.password).await
    }

    /// Block until the operator confirms the challenge was completed in
    /// a browser.
    async fn confirm_manual_completion(&mut self, challenge_url: &str) -> Result<()> {
        info!(challenge_url, "complete the challenge in a browser or the platform app");
        let prompt = format!(
            "The platform locked this login.\nComplete the challenge: {challenge_url}\nReply with \"done\" once you have approved it."
        );
        self.channel
            .request_confirmation(
                &prompt,
                &evaluate::affirmation,
                self.confirmation_timeout,
                "After approving the login in a browser, press enter to retry:",
            )
            .await?;
        info!("manual completion confirmed; retrying login");
        Ok(())
    }
}
