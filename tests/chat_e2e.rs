use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{body::Body, Router};
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use provenance_chat::intent::{IntentModel, IntentSet};
use provenance_chat::provenance::{FileHash, LedgerError, Provenance, RegistryWriter};
use provenance_chat::session_log::{LogEntry, SessionLog};
use provenance_chat::{build_app, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const TX_HASH: &str = "0x8f1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c";

#[derive(Default)]
struct MockRegistry {
    fail: bool,
    commits: Mutex<Vec<(String, FileHash, String)>>,
}

#[async_trait]
impl RegistryWriter for MockRegistry {
    async fn register_dataset(&self, _: &str, _: FileHash, _: &str) -> Result<String, LedgerError> {
        Ok(TX_HASH.to_string())
    }

    async fn register_model(&self, _: &str, _: FileHash, _: &str) -> Result<String, LedgerError> {
        Ok(TX_HASH.to_string())
    }

    async fn commit_log(
        &self,
        session_id: &str,
        file_hash: FileHash,
        model_version: &str,
    ) -> Result<String, LedgerError> {
        if self.fail {
            return Err(LedgerError::Rpc("connection refused".to_string()));
        }
        self.commits.lock().unwrap().push((
            session_id.to_string(),
            file_hash,
            model_version.to_string(),
        ));
        Ok(TX_HASH.to_string())
    }
}

fn intents() -> IntentSet {
    serde_json::from_value(json!({
        "intents": [
            {"tag": "greeting", "patterns": ["Hello", "Hi there", "Good morning"], "responses": ["Hi!"]},
            {"tag": "goodbye", "patterns": ["Bye", "See you later"], "responses": ["See you!"]}
        ]
    }))
    .unwrap()
}

async fn build_test_app(dir: &TempDir, registry: Option<Arc<MockRegistry>>) -> Router {
    let session_log = SessionLog::open(dir.path().join("logs")).await.unwrap();
    build_app(AppState {
        model: Arc::new(IntentModel::train(&intents()).unwrap()),
        session_log: Arc::new(session_log),
        provenance: registry.map(|r| Provenance::new(r as Arc<dyn RegistryWriter>)),
    })
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn read_log(dir: &TempDir, session_id: &str) -> Vec<LogEntry> {
    let path = dir.path().join("logs").join(format!("{session_id}.jsonl"));
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn e2e_chat_replies_and_logs_the_exchange() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir, None).await;

    let response = app
        .oneshot(chat_request(json!({"message": "  hello  ", "session_id": "abc-123"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "reply": "Hi!",
            "session_id": "abc-123",
            "meta": {
                "intent_tag": "greeting",
                "model_version": "v1.0",
                "dataset_id": "intents_v1",
                "log_tx_hash": null
            }
        })
    );

    let entries = read_log(&dir, "abc-123");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_message, "hello");
    assert_eq!(entries[0].bot_reply, "Hi!");
    assert_eq!(entries[0].intent_tag, "greeting");
    assert_eq!(entries[0].dataset_id, "intents_v1");
}

#[tokio::test]
async fn e2e_chat_appends_to_the_same_session_log() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir, None).await;

    for message in ["hello", "bye"] {
        let response = app
            .clone()
            .oneshot(chat_request(json!({"message": message, "session_id": "s1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let tags: Vec<_> = read_log(&dir, "s1").into_iter().map(|e| e.intent_tag).collect();
    assert_eq!(tags, vec!["greeting", "goodbye"]);
}

#[tokio::test]
async fn e2e_missing_session_id_gets_generated() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir, None).await;

    let response = app
        .oneshot(chat_request(json!({"message": "hello"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let session_id = body["session_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(session_id).is_ok());
    assert_eq!(read_log(&dir, session_id).len(), 1);
}

#[tokio::test]
async fn e2e_empty_message_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir, None).await;

    let response = app
        .oneshot(chat_request(json!({"message": "   ", "session_id": "s1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Empty message", "session_id": "s1"})
    );
    assert!(!dir.path().join("logs").join("s1.jsonl").exists());
}

#[tokio::test]
async fn e2e_path_like_session_id_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir, None).await;

    let response = app
        .oneshot(chat_request(json!({"message": "hello", "session_id": "../../escape"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid session_id");
    assert!(!dir.path().join("escape.jsonl").exists());
}

#[tokio::test]
async fn e2e_committed_log_hash_is_returned() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(MockRegistry::default());
    let app = build_test_app(&dir, Some(registry.clone())).await;

    let response = app
        .oneshot(chat_request(json!({"message": "hello", "session_id": "s1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["meta"]["log_tx_hash"], TX_HASH);

    let log_path = dir.path().join("logs").join("s1.jsonl");
    let expected_hash = provenance_chat::provenance::hash_file(Path::new(&log_path))
        .await
        .unwrap();
    let commits = registry.commits.lock().unwrap();
    assert_eq!(
        *commits,
        vec![("s1".to_string(), expected_hash, "v1.0".to_string())]
    );
}

#[tokio::test]
async fn e2e_failed_commit_still_replies() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(MockRegistry {
        fail: true,
        ..Default::default()
    });
    let app = build_test_app(&dir, Some(registry)).await;

    let response = app
        .oneshot(chat_request(json!({"message": "hello", "session_id": "s1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["reply"], "Hi!");
    assert!(body["meta"]["log_tx_hash"].is_null());
}

#[tokio::test]
async fn e2e_health_reports_model_version() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir, None).await;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"status": "ok", "model_version": "v1.0"})
    );
}

#[tokio::test]
async fn e2e_404_fallback_path_returns_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir, None).await;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await, json!({"error": "Not found"}));
}
