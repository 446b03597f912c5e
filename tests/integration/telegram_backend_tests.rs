//! Long-poll backend behavior against a scripted Bot API fixture:
//! backlog drain, offset advancement, sender/chat filtering, stop
//! vocabulary, message delivery.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use doorman::confirm::evaluate::{affirmation, security_code};
use doorman::confirm::telegram::TelegramBackend;
use doorman::AppError;

use super::test_helpers::spawn_http;

const CHAT_ID: i64 = 4242;

#[derive(Default)]
struct TelegramFixture {
    batches: Mutex<VecDeque<Vec<Value>>>,
    polls: Mutex<Vec<HashMap<String, String>>>,
    sent: Mutex<Vec<Value>>,
}

impl TelegramFixture {
    fn push_batch(&self, batch: Vec<Value>) {
        self.batches.lock().expect("lock").push_back(batch);
    }

    fn polls(&self) -> Vec<HashMap<String, String>> {
        self.polls.lock().expect("lock").clone()
    }

    fn drain_polls(&self) -> usize {
        self.polls
            .lock()
            .expect("lock")
            .iter()
            .filter(|params| params.get("timeout").map(String::as_str) == Some("0"))
            .count()
    }
}

async fn get_updates(
    State(fixture): State<Arc<TelegramFixture>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    fixture.polls.lock().expect("lock").push(params);
    let batch = fixture
        .batches
        .lock()
        .expect("lock")
        .pop_front()
        .unwrap_or_default();
    Json(json!({ "ok": true, "result": batch }))
}

async fn send_message(
    State(fixture): State<Arc<TelegramFixture>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    fixture.sent.lock().expect("lock").push(body);
    Json(json!({ "ok": true, "result": {} }))
}

async fn backend_with_fixture() -> (TelegramBackend, Arc<TelegramFixture>) {
    let fixture = Arc::new(TelegramFixture::default());
    let router = Router::new()
        .route("/botTOKEN/getUpdates", get(get_updates))
        .route("/botTOKEN/sendMessage", post(send_message))
        .with_state(Arc::clone(&fixture));
    let base = spawn_http(router).await;
    let backend = TelegramBackend::new(&base, "TOKEN", CHAT_ID, Duration::from_secs(0));
    (backend, fixture)
}

fn update(id: i64, chat: i64, text: &str, is_bot: bool) -> Value {
    json!({
        "update_id": id,
        "message": {
            "chat": { "id": chat },
            "from": { "is_bot": is_bot },
            "text": text,
        },
    })
}

#[tokio::test]
async fn backlog_is_drained_and_never_evaluated() {
    let (mut backend, fixture) = backend_with_fixture().await;
    // A stale affirmative sits in the backlog before the prompt goes out.
    fixture.push_batch(vec![update(7, CHAT_ID, "done", false)]);

    let reply = backend
        .wait_for_reply(&affirmation, Duration::from_millis(200))
        .await
        .expect("wait runs");

    assert!(reply.is_none(), "stale reply must not qualify");
    let polls = fixture.polls();
    assert_eq!(polls[0].get("timeout").map(String::as_str), Some("0"));
    assert!(polls[0].get("offset").is_none());
    // The drain advanced the cursor past the backlog.
    assert_eq!(polls[1].get("offset").map(String::as_str), Some("8"));
}

#[tokio::test]
async fn live_reply_is_accepted_verbatim() {
    let (mut backend, fixture) = backend_with_fixture().await;
    fixture.push_batch(Vec::new());
    fixture.push_batch(vec![update(9, CHAT_ID, " done ", false)]);

    let reply = backend
        .wait_for_reply(&affirmation, Duration::from_secs(5))
        .await
        .expect("wait runs");

    assert_eq!(reply.as_deref(), Some("done"));
}

#[tokio::test]
async fn bot_and_foreign_chat_messages_are_ignored() {
    let (mut backend, fixture) = backend_with_fixture().await;
    fixture.push_batch(Vec::new());
    fixture.push_batch(vec![
        update(10, CHAT_ID, "048213", true),
        update(11, CHAT_ID + 1, "048213", false),
        update(12, CHAT_ID, "the code is 995511", false),
    ]);

    let reply = backend
        .wait_for_reply(&security_code, Duration::from_secs(5))
        .await
        .expect("wait runs");

    assert_eq!(reply.as_deref(), Some("995511"));
}

#[tokio::test]
async fn stop_word_raises_cancellation() {
    let (mut backend, fixture) = backend_with_fixture().await;
    fixture.push_batch(Vec::new());
    fixture.push_batch(vec![update(20, CHAT_ID, "STOP", false)]);

    let err = backend
        .wait_for_reply(&affirmation, Duration::from_secs(5))
        .await
        .expect_err("stop cancels");

    assert!(matches!(err, AppError::StopRequested), "got {err:?}");
}

#[tokio::test]
async fn backlog_drain_runs_only_once() {
    let (mut backend, fixture) = backend_with_fixture().await;
    fixture.push_batch(vec![update(7, CHAT_ID, "done", false)]);

    let first = backend
        .wait_for_reply(&affirmation, Duration::from_millis(150))
        .await
        .expect("first wait runs");
    assert!(first.is_none());

    fixture.push_batch(vec![update(8, CHAT_ID, "done", false)]);
    let second = backend
        .wait_for_reply(&affirmation, Duration::from_secs(5))
        .await
        .expect("second wait runs");
    assert_eq!(second.as_deref(), Some("done"));

    assert_eq!(fixture.drain_polls(), 1, "drain must happen once per backend");
}

#[tokio::test]
async fn timeout_without_qualifying_reply_is_none() {
    let (mut backend, _fixture) = backend_with_fixture().await;

    let reply = backend
        .wait_for_reply(&affirmation, Duration::from_millis(150))
        .await
        .expect("wait runs");

    assert!(reply.is_none());
}

#[tokio::test]
async fn send_message_posts_to_the_configured_chat() {
    let (backend, fixture) = backend_with_fixture().await;

    backend.send_message("hello operator").await.expect("send works");

    let sent = fixture.sent.lock().expect("lock").clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["chat_id"], json!(CHAT_ID));
    assert_eq!(sent[0]["text"], json!("hello operator"));
}

#[tokio::test]
async fn caption_is_used_when_text_is_absent() {
    let (mut backend, fixture) = backend_with_fixture().await;
    fixture.push_batch(Vec::new());
    fixture.push_batch(vec![json!({
        "update_id": 30,
        "message": {
            "chat": { "id": CHAT_ID },
            "from": { "is_bot": false },
            "caption": "code 4711",
        },
    })]);

    let reply = backend
        .wait_for_reply(&security_code, Duration::from_secs(5))
        .await
        .expect("wait runs");

    assert_eq!(reply.as_deref(), Some("4711"));
}
