//! Telegram bot long-poll confirmation backend.
//!
//! One backend instance owns the update offset cursor and the
//! drained-once flag; it is only ever touched by the single logical
//! flow, so no locking is involved.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::confirm::{EvalFn, Evaluation};
use crate::{AppError, Result};

/// Global cancellation vocabulary, matched case-insensitively against
/// the trimmed reply.
const STOP_WORDS: [&str; 5] = ["stop", "cancel", "abort", "quit", "exit"];

/// Grace added on top of the server-side long-poll bound before the
/// HTTP request itself is abandoned.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Whether the reply invokes the global cancellation vocabulary.
#[must_use]
pub fn is_stop_command(text: &str) -> bool {
    STOP_WORDS.iter().any(|word| text.eq_ignore_ascii_case(word))
}

/// One entry of a `getUpdates` response.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier.
    pub update_id: i64,
    /// New message, if this update carries one.
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    /// Edited message, if this update carries one.
    #[serde(default)]
    pub edited_message: Option<IncomingMessage>,
    /// Callback query (button press), if this update carries one.
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// Message payload inside an update.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// Conversation the message belongs to.
    #[serde(default)]
    pub chat: Option<Chat>,
    /// Sender of the message.
    #[serde(default)]
    pub from: Option<Sender>,
    /// Message text.
    #[serde(default)]
    pub text: Option<String>,
    /// Media caption, used when there is no text.
    #[serde(default)]
    pub caption: Option<String>,
}

/// Conversation identifier wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Numeric conversation identifier.
    pub id: i64,
}

/// Sender metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    /// Whether the sender is a bot.
    #[serde(default)]
    pub is_bot: bool,
}

/// Callback query payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    /// Message the callback was attached to.
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    /// Callback data string.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

/// Cloneable outbound-only handle for detached notifications.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_base: String,
    chat_id: i64,
}

impl TelegramNotifier {
    /// Post a plain message into the configured conversation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` on transport failure and
    /// `AppError::Confirm` when the API rejects the message.
    pub async fn send(&self, text: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/sendMessage", self.bot_base))
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .map_err(|err| AppError::Http(format!("telegram send failed: {err}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Confirm(format!(
                "telegram send rejected ({status}): {body}"
            )))
        }
    }
}

/// Long-poll message source addressed to one fixed conversation.
pub struct TelegramBackend {
    http: reqwest::Client,
    bot_base: String,
    chat_id: i64,
    poll_cycle: Duration,
    update_offset: i64,
    drained: bool,
}

impl TelegramBackend {
    /// Create a backend for one bot credential and conversation.
    #[must_use]
    pub fn new(api_base: &str, bot_token: &str, chat_id: i64, poll_cycle: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_base: format!("{api_base}/bot{bot_token}"),
            chat_id,
            poll_cycle,
            update_offset: 0,
            drained: false,
        }
    }

    /// Outbound-only handle for detached notifications.
    #[must_use]
    pub fn notifier(&self) -> TelegramNotifier {
        TelegramNotifier {
            http: self.http.clone(),
            bot_base: self.bot_base.clone(),
            chat_id: self.chat_id,
        }
    }

    /// Post a plain message into the configured conversation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` on transport failure and
    /// `AppError::Confirm` when the API rejects the message.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        self.notifier().send(text).await
    }

    /// Wait for a reply the evaluator accepts, bounded by `timeout`.
    ///
    /// `Ok(None)` on timeout expiry; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AppError::StopRequested` when a reply matches the stop
    /// vocabulary.
    pub async fn wait_for_reply(
        &mut self,
        evaluate: &EvalFn<'_>,
        timeout: Duration,
    ) -> Result<Option<String>> {
        self.drain_backlog().await;

        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let updates = self.poll_once().await;
            for update in updates {
                let Some(reply) = self.candidate_text(&update) else {
                    continue;
                };
                if is_stop_command(&reply) {
                    info!(reply, "stop command received");
                    return Err(AppError::StopRequested);
                }
                match evaluate(&reply) {
                    Evaluation::Accept(value) => return Ok(Some(value)),
                    Evaluation::AcceptText => return Ok(Some(reply)),
                    Evaluation::Reject => debug!(reply, "reply did not qualify; still waiting"),
                }
            }
        }

        Ok(None)
    }

    /// Consume any backlog once without waiting so stale messages are
    /// never mistaken for a live reply.
    async fn drain_backlog(&mut self) {
        if self.drained {
            return;
        }
        match self.get_updates(Duration::ZERO).await {
            Ok(updates) => {
                if !updates.is_empty() {
                    debug!(count = updates.len(), "drained stale updates");
                }
            }
            Err(err) => warn!(%err, "failed to initialize telegram updates"),
        }
        self.drained = true;
    }

    /// One bounded long-poll cycle; transport and shape errors degrade
    /// to an empty batch.
    async fn poll_once(&mut self) -> Vec<Update> {
        match self.get_updates(self.poll_cycle).await {
            Ok(updates) => updates,
            Err(err) => {
                warn!(%err, "failed to fetch telegram updates");
                Vec::new()
            }
        }
    }

    async fn get_updates(&mut self, wait: Duration) -> Result<Vec<Update>> {
        let mut request = self
            .http
            .get(format!("{}/getUpdates", self.bot_base))
            .timeout(wait + POLL_GRACE)
            .query(&[("timeout", wait.as_secs().to_string())]);
        if self.update_offset != 0 {
            request = request.query(&[("offset", self.update_offset.to_string())]);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AppError::Http(format!("telegram poll failed: {err}")))?;
        let payload: UpdatesResponse = response
            .json()
            .await
            .map_err(|err| AppError::Confirm(format!("unexpected telegram response: {err}")))?;

        if !payload.ok {
            return Err(AppError::Confirm("telegram getUpdates returned not-ok".into()));
        }

        if let Some(last) = payload.result.last() {
            self.update_offset = last.update_id + 1;
        }

        Ok(payload.result)
    }

    /// Extract the candidate reply text from an update, filtering out
    /// automated senders and foreign conversations.
    fn candidate_text(&self, update: &Update) -> Option<String> {
        let message = update
            .message
            .as_ref()
            .or(update.edited_message.as_ref())
            .or_else(|| update.callback_query.as_ref()?.message.as_ref())?;

        let chat_id = message.chat.as_ref()?.id;
        if chat_id != self.chat_id {
            return None;
        }

        if message.from.as_ref().is_some_and(|from| from.is_bot) {
            return None;
        }

        let text = message
            .text
            .as_deref()
            .or_else(|| {
                update
                    .callback_query
                    .as_ref()
                    .and_then(|query| query.data.as_deref())
            })
            .or(message.caption.as_deref())?
            .trim();

        if text.is_empty() {
            None
        } else {
            Some(text.to_owned())
        }
    }
}
