//! Router tests driven without a network listener

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chat_context::api::build_router;
use chat_context::llm::{CompletionProvider, SummaryOutput, SummaryProvider};
use chat_context::store::{MemoryStore, Message, Summary};
use chat_context::{ChatService, Config, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct Echo;

#[async_trait]
impl CompletionProvider for Echo {
    async fn complete(&self, _context: &str, input: &str, _max: usize) -> Result<Vec<String>> {
        Ok(vec![format!("{} there", input), format!("{} friend", input)])
    }
}

#[async_trait]
impl SummaryProvider for Echo {
    async fn summarize(&self, messages: &[Message], _existing: &Summary) -> Result<SummaryOutput> {
        Ok(SummaryOutput {
            prompt: format!("{} messages so far", messages.len()),
            key_info: Vec::new(),
        })
    }
}

fn app() -> Router {
    let config = Config::default();
    let provider = Arc::new(Echo);
    let service = Arc::new(ChatService::new(
        &config,
        Arc::new(MemoryStore::new()),
        provider.clone(),
        provider,
    ));
    build_router(service, &config.server)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn save(app: &Router, content: &str, sequence: i64) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/api/chat/message",
            json!({
                "conversation_id": "c1",
                "sender_id": "alice",
                "content": content,
                "sequence": sequence
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_save_then_history() {
    let app = app();
    let saved = save(&app, "second", 2).await;
    assert_eq!(saved["status"], "success");
    save(&app, "first", 1).await;
    save(&app, "third", 3).await;

    let (status, body) = send(&app, get("/api/chat/history/c1?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["conversation_id"], "c1");
    let contents: Vec<_> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, vec!["first", "second"]);

    let (_, body) = send(&app, get("/api/chat/history/c1?limit=abc")).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_conversation_is_404() {
    let app = app();
    let (status, body) = send(&app, get("/api/chat/history/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        post_json(
            "/api/chat/complete",
            json!({"conversation_id": "missing", "sender_id": "alice", "input": "hello"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let (status, body) = send(
        &app(),
        post_json(
            "/api/chat/message",
            json!({"conversation_id": "  ", "sender_id": "alice", "content": "hi"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_complete_returns_suggestions_and_context() {
    let app = app();
    save(&app, "are we still on for lunch", 1).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/chat/complete",
            json!({"conversation_id": "c1", "sender_id": "alice", "input": "hello", "max_suggestions": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["suggestions"], json!(["hello there"]));
    assert!(body["context_used"]
        .as_str()
        .unwrap()
        .contains("[alice]: are we still on for lunch"));
}

#[tokio::test]
async fn test_short_input_returns_empty_suggestions() {
    let app = app();
    save(&app, "hey", 1).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/chat/complete",
            json!({"conversation_id": "c1", "sender_id": "alice", "input": "h"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["suggestions"], json!([]));
}

#[tokio::test]
async fn test_metrics_exposition() {
    let app = app();
    save(&app, "hello", 1).await;

    let (status, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("messages_saved_total"));
}
