//! Human confirmation channel with remote and local backends.
//!
//! [`Confirmer`] decouples the login core from how a qualifying operator
//! reply is obtained. The production [`ConfirmationChannel`] tries the
//! Telegram long-poll backend first and falls back to a local terminal
//! prompt; tests substitute scripted fakes through the trait.

pub mod evaluate;
pub mod local;
pub mod telegram;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::confirm::telegram::TelegramBackend;
use crate::Result;

/// Outcome of evaluating one candidate operator reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Accept with the derived value.
    Accept(String),
    /// Accept the raw reply text verbatim.
    AcceptText,
    /// Not a qualifying reply; keep waiting.
    Reject,
}

/// Evaluator applied to candidate replies.
pub type EvalFn<'e> = dyn Fn(&str) -> Evaluation + Send + Sync + 'e;

/// Boxed future returned by [`Confirmer`] methods.
pub type ConfirmFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Interface for obtaining a qualifying human reply within bounded time.
pub trait Confirmer: Send + Sync {
    /// Ask through the remote backend only.
    ///
    /// `Ok(None)` when the backend is not configured or no qualifying
    /// reply arrived before the timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StopRequested`](crate::AppError::StopRequested)
    /// when the operator replies with the stop vocabulary.
    fn request_remote<'a>(
        &'a mut self,
        prompt: &'a str,
        evaluate: &'a EvalFn<'a>,
        timeout: Duration,
    ) -> ConfirmFuture<'a, Option<String>>;

    /// Ask through the remote backend, then fall back to the local
    /// prompt (which has no timeout) when the remote backend is not
    /// configured or yields nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StopRequested`](crate::AppError::StopRequested)
    /// on a stop reply and
    /// [`AppError::Confirm`](crate::AppError::Confirm) if the local
    /// prompt cannot be read.
    fn request_confirmation<'a>(
        &'a mut self,
        prompt: &'a str,
        evaluate: &'a EvalFn<'a>,
        timeout: Duration,
        local_prompt: &'a str,
    ) -> ConfirmFuture<'a, String>;

    /// Deliver a notification through the remote backend.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Confirm`](crate::AppError::Confirm) or
    /// [`AppError::Http`](crate::AppError::Http) when delivery fails;
    /// a missing remote backend is not an error.
    fn notify<'a>(&'a self, text: &'a str) -> ConfirmFuture<'a, ()>;

    /// Fire-and-forget notification: delivery runs detached and failure
    /// is only logged.
    fn alert(&self, text: String);
}

/// Production confirmation channel.
pub struct ConfirmationChannel {
    remote: Option<TelegramBackend>,
}

impl ConfirmationChannel {
    /// Build a channel with an optional remote backend.
    #[must_use]
    pub fn new(remote: Option<TelegramBackend>) -> Self {
        Self { remote }
    }

    /// Build the channel from configuration; the remote backend is
    /// activated only when both the bot token and chat id are present.
    #[must_use]
    pub fn from_config(config: &GlobalConfig) -> Self {
        let remote = match (config.telegram.chat_id, config.telegram.bot_token.as_str()) {
            (Some(chat_id), token) if !token.is_empty() => Some(TelegramBackend::new(
                &config.telegram.api_base,
                token,
                chat_id,
                Duration::from_secs(config.timeouts.poll_cycle_seconds),
            )),
            _ => {
                info!("telegram not configured; confirmations use the local prompt");
                None
            }
        };
        Self::new(remote)
    }
}

impl Confirmer for ConfirmationChannel {
    fn request_remote<'a>(
        &'a mut self,
        prompt: &'a str,
        evaluate: &'a EvalFn<'a>,
        timeout: Duration,
    ) -> ConfirmFuture<'a, Option<String>> {
        Box::pin(async move {
            let Some(remote) = self.remote.as_mut() else {
                return Ok(None);
            };
            if let Err(err) = remote.send_message(prompt).await {
                warn!(%err, "failed to deliver confirmation prompt");
            }
            remote.wait_for_reply(evaluate, timeout).await
        })
    }

    fn request_confirmation<'a>(
        &'a mut self,
        prompt: &'a str,
        evaluate: &'a EvalFn<'a>,
        timeout: Duration,
        local_prompt: &'a str,
    ) -> ConfirmFuture<'a, String> {
        Box::pin(async move {
            if self.remote.is_some() {
                if let Some(value) = self.request_remote(prompt, evaluate, timeout).await? {
                    return Ok(value);
                }
                warn!("no qualifying remote reply; falling back to the local prompt");
            }
            local::prompt_line(local_prompt).await
        })
    }

    fn notify<'a>(&'a self, text: &'a str) -> ConfirmFuture<'a, ()> {
        Box::pin(async move {
            if let Some(remote) = self.remote.as_ref() {
                remote.send_message(text).await?;
            }
            Ok(())
        })
    }

    fn alert(&self, text: String) {
        let Some(notifier) = self.remote.as_ref().map(TelegramBackend::notifier) else {
            return;
        };
        tokio::spawn(async move {
            if let Err(err) = notifier.send(&text).await {
                warn!(%err, "background notification failed");
            }
        });
    }
}
