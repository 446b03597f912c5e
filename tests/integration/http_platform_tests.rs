//! HTTP platform client wire behavior against a scripted API fixture:
//! login outcomes, checkpoint extraction, session round-trip, challenge
//! signals.

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use doorman::config::PlatformConfig;
use doorman::models::checkpoint::ChallengeStep;
use doorman::platform::http::HttpPlatformClient;
use doorman::platform::PlatformClient;
use doorman::AppError;

use super::test_helpers::{checkpoint, checkpoint_without_api_path, spawn_http};

fn platform_config(base_url: &str) -> PlatformConfig {
    PlatformConfig {
        base_url: base_url.to_owned(),
        username: "astra".into(),
        user_agent: "doorman-test".into(),
        proxy: None,
        password: "pw".into(),
    }
}

async fn login_ok() -> Json<Value> {
    Json(json!({
        "token": "TOK",
        "logged_in_user": { "user_id": 1, "username": "astra" },
    }))
}

async fn current_user(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer TOK");
    if authorized {
        (
            StatusCode::OK,
            Json(json!({ "user": { "user_id": 1, "username": "astra" } })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "login_required" })),
        )
    }
}

#[tokio::test]
async fn login_success_authenticates_the_client() {
    let router = Router::new()
        .route("/accounts/login/", post(login_ok))
        .route("/accounts/current_user/", get(current_user));
    let base = spawn_http(router).await;
    let client = HttpPlatformClient::new(&platform_config(&base)).expect("client builds");

    let identity = client.login("astra", "pw").await.expect("login succeeds");
    assert_eq!(identity.username, "astra");

    // The session token from the login response authorizes later calls.
    let current = client.current_user().await.expect("lookup succeeds");
    assert_eq!(current.user_id, 1);
}

#[tokio::test]
async fn session_blob_round_trips_between_clients() {
    let router = Router::new()
        .route("/accounts/login/", post(login_ok))
        .route("/accounts/current_user/", get(current_user));
    let base = spawn_http(router).await;
    let config = platform_config(&base);

    let first = HttpPlatformClient::new(&config).expect("client builds");
    first.login("astra", "pw").await.expect("login succeeds");
    let session = first.export_session().await.expect("session exports");

    let second = HttpPlatformClient::new(&config).expect("client builds");
    second
        .restore_session(&session)
        .await
        .expect("session restores");
    let identity = second.current_user().await.expect("restored session works");
    assert_eq!(identity.username, "astra");
}

#[tokio::test]
async fn export_without_login_is_a_session_error() {
    let client =
        HttpPlatformClient::new(&platform_config("http://127.0.0.1:9")).expect("client builds");
    let err = client.export_session().await.expect_err("nothing to export");
    assert!(matches!(err, AppError::Session(_)), "got {err:?}");
}

#[tokio::test]
async fn restore_rejects_a_foreign_blob() {
    let client =
        HttpPlatformClient::new(&platform_config("http://127.0.0.1:9")).expect("client builds");
    let blob = doorman::models::session::Session::new(json!({ "something": "else" }));
    let err = client
        .restore_session(&blob)
        .await
        .expect_err("foreign blob rejected");
    assert!(matches!(err, AppError::Session(_)), "got {err:?}");
}

#[tokio::test]
async fn checkpoint_login_failure_maps_to_checkpoint_required() {
    async fn login_checkpoint() -> (StatusCode, Json<Value>) {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "challenge_required",
                "challenge": {
                    "url": "https://platform.example/challenge/7/abc/",
                    "api_path": "/challenge/7/abc/",
                    "lock": true,
                },
            })),
        )
    }

    let router = Router::new().route("/accounts/login/", post(login_checkpoint));
    let base = spawn_http(router).await;
    let client = HttpPlatformClient::new(&platform_config(&base)).expect("client builds");

    let err = client.login("astra", "pw").await.expect_err("checkpoint");
    let AppError::CheckpointRequired(checkpoint) = err else {
        panic!("expected checkpoint, got {err:?}");
    };
    assert_eq!(checkpoint.api_path.as_deref(), Some("/challenge/7/abc/"));
    assert!(checkpoint.locked);
    assert_eq!(
        checkpoint.url,
        "https://platform.example/challenge/7/abc/"
    );
}

#[tokio::test]
async fn other_login_failure_is_a_platform_error() {
    async fn login_rejected() -> (StatusCode, Json<Value>) {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "bad_password" })),
        )
    }

    let router = Router::new().route("/accounts/login/", post(login_rejected));
    let base = spawn_http(router).await;
    let client = HttpPlatformClient::new(&platform_config(&base)).expect("client builds");

    let err = client.login("astra", "pw").await.expect_err("rejected");
    assert!(matches!(err, AppError::Platform(_)), "got {err:?}");
    assert!(err.to_string().contains("bad_password"));
}

#[tokio::test]
async fn expired_session_maps_to_auth_error() {
    let router = Router::new().route("/accounts/current_user/", get(current_user));
    let base = spawn_http(router).await;
    let client = HttpPlatformClient::new(&platform_config(&base)).expect("client builds");

    let err = client.current_user().await.expect_err("unauthorized");
    assert!(matches!(err, AppError::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn no_active_checkpoint_signal_is_mapped() {
    async fn auto_rejected() -> (StatusCode, Json<Value>) {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "no_active_checkpoint" })),
        )
    }

    let router = Router::new().route("/challenge/7/abc/auto/", post(auto_rejected));
    let base = spawn_http(router).await;
    let client = HttpPlatformClient::new(&platform_config(&base)).expect("client builds");

    let err = client
        .challenge_auto(&checkpoint(false))
        .await
        .expect_err("no checkpoint");
    assert!(matches!(err, AppError::NoCheckpoint), "got {err:?}");
}

#[tokio::test]
async fn challenge_state_parses_the_step() {
    async fn state_body() -> Json<Value> {
        Json(json!({ "step_name": "verify_code", "step_data": {} }))
    }

    let router = Router::new().route("/challenge/7/abc/", get(state_body));
    let base = spawn_http(router).await;
    let client = HttpPlatformClient::new(&platform_config(&base)).expect("client builds");

    let state = client
        .challenge_state(&checkpoint(false))
        .await
        .expect("state fetches");
    assert_eq!(state.step(), ChallengeStep::VerifyCode);
}

#[tokio::test]
async fn challenge_call_without_api_path_is_malformed() {
    let client =
        HttpPlatformClient::new(&platform_config("http://127.0.0.1:9")).expect("client builds");

    let err = client
        .challenge_auto(&checkpoint_without_api_path())
        .await
        .expect_err("missing api path");
    assert!(matches!(err, AppError::MalformedCheckpoint(_)), "got {err:?}");
}

#[tokio::test]
async fn simulate_calls_tolerate_empty_bodies() {
    async fn ok_empty() -> StatusCode {
        StatusCode::NO_CONTENT
    }

    let router = Router::new().route("/simulate/pre_login_flow/", post(ok_empty));
    let base = spawn_http(router).await;
    let client = HttpPlatformClient::new(&platform_config(&base)).expect("client builds");

    client.pre_login_flow().await.expect("simulation runs");
}
