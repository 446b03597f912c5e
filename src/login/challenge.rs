//! Checkpoint challenge resolution.
//!
//! Interprets one checkpoint's challenge step and drives it toward a
//! verification-code or closed state, pulling the operator in through
//! the confirmation channel where a decision is needed.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::confirm::{evaluate, Confirmer};
use crate::models::checkpoint::{ChallengeState, ChallengeStep, Checkpoint, VerifyMethod};
use crate::platform::PlatformClient;
use crate::{AppError, Result};

/// Fixed approval token submitted for login review steps.
const DELTA_REVIEW_APPROVAL: &str = "0";

/// Outcome of resolving one checkpoint challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// The challenge was driven to completion; retry the login on the
    /// next attempt.
    Retry,
    /// The challenge must be completed manually in a browser; once the
    /// operator confirms, the login retries without consuming an
    /// attempt.
    ManualPending,
}

/// Drives a single checkpoint's challenge sub-protocol.
pub struct ChallengeResolver<'a> {
    platform: &'a dyn PlatformClient,
    channel: &'a mut dyn Confirmer,
    confirmation_timeout: Duration,
}

impl<'a> ChallengeResolver<'a> {
    /// Create a resolver over the given platform and channel.
    pub fn new(
        platform: &'a dyn PlatformClient,
        channel: &'a mut dyn Confirmer,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            platform,
            channel,
            confirmation_timeout,
        }
    }

    /// Resolve the checkpoint's challenge.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::FlowStalled`] when the challenge reaches a
    /// step that cannot be automated, [`AppError::StopRequested`] on
    /// operator cancellation, and any platform error not covered by the
    /// `NoCheckpoint` fallback.
    pub async fn resolve(&mut self, checkpoint: &Checkpoint) -> Result<ChallengeOutcome> {
        let Some(mut state) = self.initiate(checkpoint).await? else {
            return Ok(ChallengeOutcome::ManualPending);
        };
        debug!(?state, "challenge state");

        match state.step() {
            ChallengeStep::SelectVerifyMethod {
                methods,
                default_choice,
            } => {
                state = self
                    .select_verify_method(checkpoint, methods, default_choice)
                    .await?;
            }
            ChallengeStep::DeltaLoginReview => {
                // The review step is approved without operator input.
                state = self
                    .platform
                    .delta_login_review(checkpoint, DELTA_REVIEW_APPROVAL)
                    .await?;
            }
            ChallengeStep::VerifyCode | ChallengeStep::Other(_) => {}
        }

        if state.is_close() {
            if checkpoint.locked {
                info!("challenge closed but the login is locked; manual completion required");
                return Ok(ChallengeOutcome::ManualPending);
            }
            info!("challenge closed; retrying login");
            return Ok(ChallengeOutcome::Retry);
        }

        if state.step() != ChallengeStep::VerifyCode {
            warn!(?state, "challenge did not reach a verification code step");
            return Err(AppError::FlowStalled(format!(
                "unsupported challenge step {}",
                state.describe_step()
            )));
        }

        let code = self.request_security_code().await?;
        let response = self.platform.send_security_code(checkpoint, &code).await?;
        if response.status.as_deref() == Some("ok") && response.action.as_deref() == Some("close") {
            info!("security code accepted; retrying login");
        } else if response.logged_in_user.is_none() {
            // The next login attempt re-validates success independently.
            warn!(?response, "unexpected challenge response");
        }
        Ok(ChallengeOutcome::Retry)
    }

    /// Initiate the challenge automatically, falling back to an explicit
    /// state fetch; `None` means the platform reports no active
    /// checkpoint and the login must be completed manually.
    async fn initiate(&self, checkpoint: &Checkpoint) -> Result<Option<ChallengeState>> {
        match self.platform.challenge_auto(checkpoint).await {
            Ok(state) => return Ok(Some(state)),
            Err(AppError::NoCheckpoint) => {
                info!("platform reports no active checkpoint; manual completion required");
                return Ok(None);
            }
            Err(err) => warn!(%err, "automatic challenge initiation failed"),
        }

        match self.platform.challenge_state(checkpoint).await {
            Ok(state) => Ok(Some(state)),
            Err(AppError::NoCheckpoint) => {
                info!("platform reports no active checkpoint; manual completion required");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn select_verify_method(
        &mut self,
        checkpoint: &Checkpoint,
        methods: Vec<VerifyMethod>,
        default_choice: Option<String>,
    ) -> Result<ChallengeState> {
        let mut selected =
            default_choice.or_else(|| methods.first().map(|method| method.value.clone()));

        if methods.len() > 1 {
            let listing = methods
                .iter()
                .enumerate()
                .map(|(index, method)| format!("{}. {}", index + 1, method.label))
                .collect::<Vec<_>>()
                .join("\n");
            let prompt = format!(
                "Select a verification method:\n{listing}\nReply with the option number or name."
            );
            let evaluator = evaluate::verify_method_choice(&methods);
            match self
                .channel
                .request_remote(&prompt, &evaluator, self.confirmation_timeout)
                .await?
            {
                Some(choice) => {
                    info!(choice, "verification method selected by operator");
                    selected = Some(choice);
                }
                None => {
                    info!(default = ?selected, "no operator selection; using the default method");
                }
            }
        }

        let selected = selected.ok_or_else(|| {
            AppError::Platform("no verification methods offered by the challenge".into())
        })?;
        self.platform
            .select_verify_method(checkpoint, &selected)
            .await
    }

    async fn request_security_code(&mut self) -> Result<String> {
        self.channel
            .request_confirmation(
                "A security code was sent. Reply with the numeric code to continue.",
                &evaluate::security_code,
                self.confirmation_timeout,
                "Enter the security code sent by the platform:",
            )
            .await
    }
}
