use crate::routes::app;
use crate::state::{AppState, test_helpers};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;

type Client = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn serve(state: AppState) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    addr
}

async fn connect(state: AppState) -> (Client, String) {
    let addr = serve(state).await;
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/ws"))
        .await
        .unwrap();
    (ws, format!("http://{addr}"))
}

async fn send(ws: &mut Client, value: Value) {
    ws.send(WsMessage::Text(value.to_string().into())).await.unwrap();
}

async fn recv(ws: &mut Client) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("ws receive timed out")
            .unwrap()
            .unwrap();
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().unwrap()).unwrap();
        }
    }
}

#[tokio::test]
async fn explain_round_trip() {
    let (mut ws, _) = connect(test_helpers::test_app_state("It is placeholder text.")).await;
    send(
        &mut ws,
        json!({
            "id": "1b4e28ba-2fa1-41d2-883f-0016d3cca427",
            "action": "explain",
            "text": "Lorem ipsum dolor sit amet",
            "settings": { "apiKey": "sk" }
        }),
    )
    .await;

    let reply = recv(&mut ws).await;
    assert_eq!(reply["parentId"], "1b4e28ba-2fa1-41d2-883f-0016d3cca427");
    assert_eq!(reply["explanation"], "It is placeholder text.");
}

#[tokio::test]
async fn invalid_json_gets_error_reply() {
    let (mut ws, _) = connect(test_helpers::test_app_state("x")).await;
    ws.send(WsMessage::Text("{not json".to_string().into())).await.unwrap();
    let reply = recv(&mut ws).await;
    assert!(reply["error"].as_str().unwrap().starts_with("invalid json"));
}

#[tokio::test]
async fn open_options_is_pushed_and_acknowledged() {
    let (mut ws, _) = connect(test_helpers::test_app_state("x")).await;
    send(&mut ws, json!({ "action": "openOptions" })).await;

    let first = recv(&mut ws).await;
    let second = recv(&mut ws).await;
    let (event, reply) = if first.get("event").is_some() { (first, second) } else { (second, first) };
    assert_eq!(event, json!({ "event": "openOptions" }));
    assert_eq!(reply["success"], true);
}

#[tokio::test]
async fn saved_settings_are_pushed_to_sockets() {
    let (mut ws, base) = connect(test_helpers::test_app_state("x")).await;
    // One round trip so the connection loop is subscribed before saving.
    send(&mut ws, json!({ "action": "getSettings" })).await;
    assert!(recv(&mut ws).await["settings"].is_object());

    reqwest::Client::new()
        .post(format!("{base}/api/message"))
        .json(&json!({
            "action": "saveSettings",
            "settings": { "apiKey": "k", "model": "m", "systemInstructions": "s", "darkMode": true }
        }))
        .send()
        .await
        .unwrap();

    let event = recv(&mut ws).await;
    assert_eq!(event["event"], "settingsChanged");
    assert_eq!(event["settings"]["darkMode"], true);
}

#[tokio::test]
async fn stream_flag_adds_render_frames() {
    let (mut ws, _) = connect(test_helpers::test_app_state("Intro\n\n```sh\nls -la\n```\n")).await;
    send(
        &mut ws,
        json!({
            "id": "6a2f41a0-0b8e-4c1e-8d1e-2b1f6c8e9a77",
            "action": "explain",
            "text": "t",
            "settings": { "apiKey": "sk" },
            "stream": true
        }),
    )
    .await;

    let reply = recv(&mut ws).await;
    assert!(reply["explanation"].is_string());
    let parent_id = reply["parentId"].clone();
    assert_eq!(parent_id, "6a2f41a0-0b8e-4c1e-8d1e-2b1f6c8e9a77");

    let mut frames = Vec::new();
    loop {
        let frame = recv(&mut ws).await;
        assert_eq!(frame["event"], "render");
        assert_eq!(frame["parentId"], parent_id);
        let done = frame["done"] == true;
        frames.push(frame);
        if done {
            break;
        }
    }
    assert!(frames.len() > 1);
    let last = frames.last().unwrap()["html"].as_str().unwrap().to_string();
    assert!(last.contains("code-block"));
    assert!(last.contains("ls -la"));
}

#[tokio::test]
async fn upgrade_checks_origin() {
    let addr = serve(test_helpers::test_app_state("x")).await;

    let mut foreign = format!("ws://{addr}/api/ws").into_client_request().unwrap();
    foreign
        .headers_mut()
        .insert("origin", HeaderValue::from_static("https://evil.example"));
    match tokio_tungstenite::connect_async(foreign).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(resp)) => assert_eq!(resp.status(), 403),
        other => panic!("expected 403, got {:?}", other.map(|(_, r)| r.status())),
    }

    let mut allowed = format!("ws://{addr}/api/ws").into_client_request().unwrap();
    allowed
        .headers_mut()
        .insert("origin", HeaderValue::from_static(test_helpers::TEST_ORIGIN));
    let (mut ws, _) = tokio_tungstenite::connect_async(allowed).await.unwrap();
    send(&mut ws, json!({ "action": "getSettings" })).await;
    assert!(recv(&mut ws).await["settings"].is_object());
}
