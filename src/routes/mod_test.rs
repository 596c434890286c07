use super::*;
use crate::state::test_helpers;
use serde_json::{Value, json};

async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn healthz_is_ok() {
    let base = spawn_app(test_helpers::test_app_state("x")).await;
    let resp = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn post_message_explains() {
    let base = spawn_app(test_helpers::test_app_state("It is placeholder text.")).await;
    let body = json!({
        "id": "7f8e2a4c-0d55-4b36-9a1b-3f5b2c1d9e10",
        "action": "explain",
        "text": "Lorem ipsum dolor sit amet",
        "settings": { "apiKey": "sk", "model": "m" }
    });
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/message"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let out: Value = resp.json().await.unwrap();
    assert_eq!(out["explanation"], "It is placeholder text.");
    assert_eq!(out["parentId"], "7f8e2a4c-0d55-4b36-9a1b-3f5b2c1d9e10");
    assert!(out.get("error").is_none());
}

#[tokio::test]
async fn post_message_unknown_action_is_200_with_error() {
    let base = spawn_app(test_helpers::test_app_state("x")).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/message"))
        .json(&json!({ "action": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let out: Value = resp.json().await.unwrap();
    assert_eq!(out["error"], "unknown action: nope");
}

#[tokio::test]
async fn save_then_get_settings_over_http() {
    let base = spawn_app(test_helpers::test_app_state("x")).await;
    let client = reqwest::Client::new();
    let saved = json!({ "apiKey": "k", "model": "m", "systemInstructions": "s", "darkMode": true });

    let out: Value = client
        .post(format!("{base}/api/message"))
        .json(&json!({ "action": "saveSettings", "settings": saved }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(out["success"], true);

    let out: Value = client
        .post(format!("{base}/api/message"))
        .json(&json!({ "action": "getSettings" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(out["settings"], saved);
}

#[tokio::test]
async fn foreign_origin_cannot_read_settings() {
    let base = spawn_app(test_helpers::test_app_state("x")).await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/api/message"))
        .json(&json!({ "action": "saveSettings", "settings": { "apiKey": "sk-secret" } }))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/api/message"))
        .header("origin", "https://evil.example")
        .json(&json!({ "action": "getSettings" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
    assert!(resp.headers().get("access-control-allow-origin").is_none());
    assert!(!resp.text().await.unwrap().contains("sk-secret"));
}

#[tokio::test]
async fn foreign_origin_preflight_is_not_granted() {
    let base = spawn_app(test_helpers::test_app_state("x")).await;
    let resp = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{base}/api/message"))
        .header("origin", "https://evil.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn configured_origin_is_allowed() {
    let base = spawn_app(test_helpers::test_app_state("x")).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/message"))
        .header("origin", test_helpers::TEST_ORIGIN)
        .json(&json!({ "action": "getSettings" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        test_helpers::TEST_ORIGIN
    );
}
