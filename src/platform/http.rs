//! HTTP implementation of [`PlatformClient`].
//!
//! Speaks the platform's JSON wire protocol over reqwest. Auth state
//! (device identity, session token) lives behind a mutex so the client
//! can be shared as `Arc<dyn PlatformClient>`.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::PlatformConfig;
use crate::models::checkpoint::{ChallengeResponse, ChallengeState, Checkpoint};
use crate::models::identity::Identity;
use crate::models::session::Session;
use crate::platform::{PlatformClient, PlatformFuture};
use crate::{AppError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Mutable auth state guarded for shared use.
#[derive(Debug)]
struct ClientState {
    device_id: String,
    auth_token: Option<String>,
}

/// Production platform client backed by reqwest.
pub struct HttpPlatformClient {
    http: reqwest::Client,
    base_url: String,
    state: Mutex<ClientState>,
}

impl HttpPlatformClient {
    /// Build a client for the configured platform, applying the proxy
    /// when one is set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an invalid proxy URL and
    /// `AppError::Http` if the HTTP client cannot be constructed.
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(REQUEST_TIMEOUT);

        if let Some(proxy_url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|err| AppError::Config(format!("invalid proxy url {proxy_url}: {err}")))?;
            builder = builder.proxy(proxy);
            info!(proxy = proxy_url, "routing platform calls through proxy");
        }

        let http = builder
            .build()
            .map_err(|err| AppError::Http(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            state: Mutex::new(ClientState {
                device_id: derive_device_id(&config.username),
                auth_token: None,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Absolute URL for a challenge call, rooted at the checkpoint's API
    /// path.
    fn challenge_endpoint(&self, checkpoint: &Checkpoint, leaf: Option<&str>) -> Result<String> {
        let api_path = checkpoint.api_path.as_deref().ok_or_else(|| {
            AppError::MalformedCheckpoint("checkpoint missing challenge api path".into())
        })?;
        let trimmed = api_path.trim_matches('/');
        Ok(match leaf {
            Some(leaf) => format!("{}/{trimmed}/{leaf}/", self.base_url),
            None => format!("{}/{trimmed}/", self.base_url),
        })
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let state = self.state.lock().await;
        let mut request = request.header("X-Device-Id", &state.device_id);
        if let Some(token) = &state.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Issue a request and decode the response body as JSON, tolerating
    /// empty and non-JSON bodies.
    async fn send_json(&self, request: RequestBuilder) -> Result<(StatusCode, Value)> {
        let request = self.authorize(request).await;
        let response = request
            .send()
            .await
            .map_err(|err| AppError::Http(format!("platform request failed: {err}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| AppError::Http(format!("failed to read platform response: {err}")))?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok((status, body))
    }

    async fn challenge_call(
        &self,
        checkpoint: &Checkpoint,
        leaf: Option<&str>,
        body: Option<Value>,
    ) -> Result<Value> {
        let url = self.challenge_endpoint(checkpoint, leaf)?;
        let request = match body {
            Some(json) => self.http.post(&url).json(&json),
            None => self.http.get(&url),
        };
        let (status, payload) = self.send_json(request).await?;
        if status.is_success() {
            return Ok(payload);
        }
        if message_of(&payload) == Some("no_active_checkpoint") {
            return Err(AppError::NoCheckpoint);
        }
        Err(AppError::Platform(format!(
            "challenge call failed ({status}): {}",
            describe_body(&payload)
        )))
    }

    async fn simulate(&self, path: &str) -> Result<()> {
        let (status, body) = self
            .send_json(self.http.post(self.endpoint(path)).json(&json!({})))
            .await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::Platform(format!(
                "simulation call {path} failed ({status}): {}",
                describe_body(&body)
            )))
        }
    }
}

impl PlatformClient for HttpPlatformClient {
    fn pre_login_flow(&self) -> PlatformFuture<'_, ()> {
        Box::pin(self.simulate("/simulate/pre_login_flow/"))
    }

    fn post_login_flow(&self) -> PlatformFuture<'_, ()> {
        Box::pin(self.simulate("/simulate/post_login_flow/"))
    }

    fn login<'a>(&'a self, username: &'a str, password: &'a str) -> PlatformFuture<'a, Identity> {
        Box::pin(async move {
            let device_id = self.state.lock().await.device_id.clone();
            let payload = json!({
                "username": username,
                "password": password,
                "device_id": device_id,
            });
            let (status, body) = self
                .send_json(
                    self.http
                        .post(self.endpoint("/accounts/login/"))
                        .json(&payload),
                )
                .await?;

            if status.is_success() {
                let identity = parse_identity(body.get("logged_in_user"))?;
                let token = body
                    .get("token")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| {
                        AppError::Platform("login response missing session token".into())
                    })?;
                self.state.lock().await.auth_token = Some(token);
                return Ok(identity);
            }

            if message_of(&body) == Some("challenge_required") {
                return Err(AppError::CheckpointRequired(Box::new(
                    Checkpoint::from_payload(body),
                )));
            }

            Err(AppError::Platform(format!(
                "login failed ({status}): {}",
                describe_body(&body)
            )))
        })
    }

    fn current_user(&self) -> PlatformFuture<'_, Identity> {
        Box::pin(async move {
            let (status, body) = self
                .send_json(self.http.get(self.endpoint("/accounts/current_user/")))
                .await?;
            if status == StatusCode::UNAUTHORIZED {
                return Err(AppError::Auth("session expired or invalid".into()));
            }
            if status.is_success() {
                return parse_identity(body.get("user"));
            }
            Err(AppError::Platform(format!(
                "current user lookup failed ({status}): {}",
                describe_body(&body)
            )))
        })
    }

    fn challenge_auto<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
    ) -> PlatformFuture<'a, ChallengeState> {
        Box::pin(async move {
            let payload = self
                .challenge_call(checkpoint, Some("auto"), Some(json!({})))
                .await?;
            parse_challenge_state(payload)
        })
    }

    fn challenge_state<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
    ) -> PlatformFuture<'a, ChallengeState> {
        Box::pin(async move {
            let payload = self.challenge_call(checkpoint, None, None).await?;
            parse_challenge_state(payload)
        })
    }

    fn select_verify_method<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
        value: &'a str,
    ) -> PlatformFuture<'a, ChallengeState> {
        Box::pin(async move {
            let payload = self
                .challenge_call(checkpoint, None, Some(json!({ "choice": value })))
                .await?;
            parse_challenge_state(payload)
        })
    }

    fn delta_login_review<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
        token: &'a str,
    ) -> PlatformFuture<'a, ChallengeState> {
        Box::pin(async move {
            let payload = self
                .challenge_call(checkpoint, None, Some(json!({ "choice": token })))
                .await?;
            parse_challenge_state(payload)
        })
    }

    fn send_security_code<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
        code: &'a str,
    ) -> PlatformFuture<'a, ChallengeResponse> {
        Box::pin(async move {
            let payload = self
                .challenge_call(checkpoint, None, Some(json!({ "security_code": code })))
                .await?;
            serde_json::from_value(payload)
                .map_err(|err| AppError::Platform(format!("invalid challenge response: {err}")))
        })
    }

    fn set_biography<'a>(&'a self, text: &'a str) -> PlatformFuture<'a, ()> {
        Box::pin(async move {
            let (status, body) = self
                .send_json(
                    self.http
                        .post(self.endpoint("/accounts/set_biography/"))
                        .json(&json!({ "raw_text": text })),
                )
                .await?;
            if status.is_success() {
                Ok(())
            } else {
                Err(AppError::Platform(format!(
                    "biography update failed ({status}): {}",
                    describe_body(&body)
                )))
            }
        })
    }

    fn change_profile_picture(&self, image: Vec<u8>) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            let (status, body) = self
                .send_json(
                    self.http
                        .post(self.endpoint("/accounts/change_profile_picture/"))
                        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                        .body(image),
                )
                .await?;
            if status.is_success() {
                Ok(())
            } else {
                Err(AppError::Platform(format!(
                    "profile photo upload failed ({status}): {}",
                    describe_body(&body)
                )))
            }
        })
    }

    fn export_session(&self) -> PlatformFuture<'_, Session> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let token = state.auth_token.as_deref().ok_or_else(|| {
                AppError::Session("no authenticated session to export".into())
            })?;
            Ok(Session::new(json!({
                "device_id": state.device_id,
                "auth_token": token,
            })))
        })
    }

    fn restore_session<'a>(&'a self, session: &'a Session) -> PlatformFuture<'a, ()> {
        Box::pin(async move {
            let token = session
                .as_value()
                .get("auth_token")
                .and_then(Value::as_str)
                .ok_or_else(|| AppError::Session("session blob missing auth token".into()))?;
            let mut state = self.state.lock().await;
            if let Some(device_id) = session
                .as_value()
                .get("device_id")
                .and_then(Value::as_str)
            {
                state.device_id = device_id.to_owned();
            }
            state.auth_token = Some(token.to_owned());
            Ok(())
        })
    }
}

/// Seed a stable device identity from the account username.
fn derive_device_id(username: &str) -> String {
    let digest = Sha256::digest(username.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("android-{hex}")
}

fn parse_identity(value: Option<&Value>) -> Result<Identity> {
    let value = value
        .ok_or_else(|| AppError::Platform("response missing user payload".into()))?
        .clone();
    serde_json::from_value(value)
        .map_err(|err| AppError::Platform(format!("invalid user payload: {err}")))
}

fn parse_challenge_state(payload: Value) -> Result<ChallengeState> {
    serde_json::from_value(payload)
        .map_err(|err| AppError::Platform(format!("invalid challenge state: {err}")))
}

fn message_of(body: &Value) -> Option<&str> {
    body.get("message").and_then(Value::as_str)
}

fn describe_body(body: &Value) -> String {
    message_of(body).map_or_else(|| body.to_string(), str::to_owned)
}
