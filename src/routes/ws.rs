//! WebSocket handler — envelope relay for long-lived UI surfaces.
//!
//! DESIGN
//! ======
//! On upgrade, enters a `select!` loop:
//! - Incoming text messages → one spawned task per envelope, so a slow API
//!   call never blocks the socket and replies may arrive out of order
//!   (surfaces correlate on `parentId`)
//! - Router events (`openOptions`) → forward to client
//! - Saved settings → forward as `settingsChanged`
//! - Replies and render frames from request tasks → forward to client
//!
//! An envelope carrying `"stream": true` also receives `render` events with
//! progressively revealed HTML after its reply. Closing the socket drops the
//! outbound channel, which stops any renderer still running.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → subscribe to router events and settings changes
//! 2. Client sends envelopes → spawned dispatch → reply via channel
//! 3. Close → loop exits, per-connection channels drop

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::envelope::{Event, Inbound, Outbound, Response as Body};
use crate::render::spawn_stream;
use crate::state::AppState;

const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(OUTBOUND_CHANNEL_CAPACITY);
    let mut events = state.router.subscribe_events();
    let mut settings = state.router.settings_store().subscribe();

    info!(%client_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let state = state.clone();
                        let out_tx = out_tx.clone();
                        let text = text.as_str().to_owned();
                        tokio::spawn(async move {
                            process_inbound_text(&state, client_id, &text, &out_tx).await;
                        });
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(text) = out_rx.recv() => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if !send_json(&mut socket, &event).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%client_id, skipped, "ws: event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            Ok(()) = settings.changed() => {
                let saved = settings.borrow_and_update().clone();
                if !send_json(&mut socket, &Event::SettingsChanged { settings: saved }).await {
                    break;
                }
            }
        }
    }

    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Parse one envelope, dispatch it, and queue the reply (plus render frames
/// when requested) for the socket.
async fn process_inbound_text(state: &AppState, client_id: Uuid, text: &str, out: &mpsc::Sender<String>) {
    let inbound: Inbound = match serde_json::from_str(text) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound envelope");
            let reply = Outbound::reply_to(None, Body::error(format!("invalid json: {e}")));
            forward(out, &reply).await;
            return;
        }
    };

    let wants_stream = inbound
        .payload
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let parent_id = inbound.id;

    let reply = state.router.dispatch_isolated(inbound).await;
    let reply_text = reply
        .body
        .explanation
        .clone()
        .or_else(|| reply.body.response.clone());
    if !forward(out, &reply).await {
        return;
    }

    let Some(reply_text) = reply_text.filter(|_| wants_stream) else {
        return;
    };
    let mut frames = spawn_stream(&reply_text, state.stream);
    while let Some(frame) = frames.recv().await {
        let event = Event::Render { parent_id, html: frame.html, done: frame.done };
        if !forward(out, &event).await {
            debug!(%client_id, "ws: client gone, render abandoned");
            return;
        }
    }
}

/// Serialize and write straight to the socket. `false` once the socket is
/// closed.
async fn send_json<T: Serialize>(socket: &mut WebSocket, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(text) => socket.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "ws: failed to encode outbound message");
            true
        }
    }
}

/// Serialize and queue for the socket. `false` once the connection is gone.
async fn forward<T: Serialize>(out: &mpsc::Sender<String>, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(text) => out.send(text).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "ws: failed to encode outbound message");
            true
        }
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
