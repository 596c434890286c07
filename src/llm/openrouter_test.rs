use super::*;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use serde_json::json;
use std::sync::{Arc, Mutex};

// =========================================================================
// Mock provider
// =========================================================================

#[derive(Clone)]
struct MockProvider {
    status: StatusCode,
    body: Value,
    seen: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

async fn mock_chat(
    State(mock): State<MockProvider>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.seen.lock().unwrap().push((headers, body));
    (mock.status, Json(mock.body.clone()))
}

async fn mock_models(State(mock): State<MockProvider>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    mock.seen.lock().unwrap().push((headers, Value::Null));
    (mock.status, Json(mock.body.clone()))
}

async fn spawn_provider(status: StatusCode, body: Value) -> (String, MockProvider) {
    let mock = MockProvider { status, body, seen: Arc::new(Mutex::new(Vec::new())) };
    let app = Router::new()
        .route("/chat/completions", post(mock_chat))
        .route("/models", get(mock_models))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), mock)
}

fn client_for(base_url: &str) -> OpenRouterClient {
    OpenRouterClient::new(&LlmConfig::default().with_base_url(base_url)).unwrap()
}

fn sample_request() -> ChatRequest {
    ChatRequest {
        api_key: "sk-test".into(),
        model: "anthropic/claude-3-sonnet".into(),
        messages: vec![ConversationTurn::system("be clear"), ConversationTurn::user("explain x")],
    }
}

// =========================================================================
// parse_chat_completions_response
// =========================================================================

#[test]
fn parse_text_response() {
    let json = json!({
        "model": "anthropic/claude-3-sonnet",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Hello!" } }]
    })
    .to_string();
    assert_eq!(parse_chat_completions_response(&json).unwrap(), "Hello!");
}

#[test]
fn parse_missing_choices() {
    let json = json!({ "choices": [] }).to_string();
    let err = parse_chat_completions_response(&json).unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

#[test]
fn parse_missing_content() {
    let json = json!({ "choices": [{ "message": { "role": "assistant", "content": null } }] }).to_string();
    assert!(matches!(parse_chat_completions_response(&json), Err(LlmError::MalformedResponse(_))));
}

#[test]
fn parse_not_json() {
    assert!(matches!(parse_chat_completions_response("<html>"), Err(LlmError::MalformedResponse(_))));
}

// =========================================================================
// HTTP round trips against a local provider
// =========================================================================

#[test]
fn unreadable_error_body_keeps_status() {
    let err = settle(StatusCode::INTERNAL_SERVER_ERROR, Err("connection reset".into())).unwrap_err();
    assert!(matches!(err, LlmError::Api { status: 500, message: None }));

    let err = settle(StatusCode::UNAUTHORIZED, Err("connection reset".into())).unwrap_err();
    assert!(matches!(err, LlmError::Authentication));
}

#[test]
fn unreadable_success_body_is_connectivity() {
    let err = settle(StatusCode::OK, Err("connection reset".into())).unwrap_err();
    assert!(matches!(err, LlmError::Connectivity(_)));
    assert_eq!(settle(StatusCode::OK, Ok("{}".into())).unwrap(), "{}");
}

#[tokio::test]
async fn complete_sends_expected_body_and_headers() {
    let (base, mock) = spawn_provider(
        StatusCode::OK,
        json!({ "choices": [{ "message": { "role": "assistant", "content": "It is placeholder text." } }] }),
    )
    .await;

    let text = client_for(&base).complete(&sample_request()).await.unwrap();
    assert_eq!(text, "It is placeholder text.");

    let seen = mock.seen.lock().unwrap();
    let (headers, body) = &seen[0];
    assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
    assert!(
        headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("application/json")
    );
    assert!(headers.get("http-referer").is_some());
    assert_eq!(headers.get("x-title").unwrap(), "Explain It");

    assert_eq!(body["model"], "anthropic/claude-3-sonnet");
    assert_eq!(body["max_tokens"], 1000);
    assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "explain x");
}

#[tokio::test]
async fn status_401_maps_to_authentication_error() {
    let (base, _mock) = spawn_provider(StatusCode::UNAUTHORIZED, json!({ "error": { "message": "No auth" } })).await;
    let err = client_for(&base).complete(&sample_request()).await.unwrap_err();
    assert!(err.to_string().contains("Authentication error"));
}

#[tokio::test]
async fn status_429_maps_to_rate_limit_error() {
    let (base, _mock) = spawn_provider(StatusCode::TOO_MANY_REQUESTS, json!({})).await;
    let err = client_for(&base).complete(&sample_request()).await.unwrap_err();
    assert!(err.to_string().contains("Rate limit exceeded"));
}

#[tokio::test]
async fn status_400_surfaces_provider_message() {
    let (base, _mock) =
        spawn_provider(StatusCode::BAD_REQUEST, json!({ "error": { "message": "context too long" } })).await;
    let err = client_for(&base).complete(&sample_request()).await.unwrap_err();
    assert_eq!(err.to_string(), "API error (status 400): context too long");
}

#[tokio::test]
async fn ok_status_with_bad_shape_is_malformed() {
    let (base, _mock) = spawn_provider(StatusCode::OK, json!({ "id": "x" })).await;
    let err = client_for(&base).complete(&sample_request()).await.unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

#[tokio::test]
async fn unreachable_provider_is_connectivity_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(&format!("http://{addr}"))
        .complete(&sample_request())
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Connectivity(_)));
    assert!(err.to_string().starts_with("Network error"));
}

#[tokio::test]
async fn check_key_hits_models_endpoint() {
    let (base, mock) = spawn_provider(StatusCode::OK, json!({ "data": [] })).await;
    client_for(&base).check_key("sk-good").await.unwrap();

    let seen = mock.seen.lock().unwrap();
    assert_eq!(seen[0].0.get("authorization").unwrap(), "Bearer sk-good");
}

#[tokio::test]
async fn check_key_rejected() {
    let (base, _mock) = spawn_provider(StatusCode::UNAUTHORIZED, json!({})).await;
    let err = client_for(&base).check_key("sk-bad").await.unwrap_err();
    assert!(matches!(err, LlmError::Authentication));
}

