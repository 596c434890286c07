//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! UI surfaces reach the background service over HTTP: a request/response
//! endpoint for one-shot envelopes and a websocket for surfaces that also
//! want pushed events and streamed rendering.
//!
//! ORIGIN POLICY
//! =============
//! The settings actions read and write the stored API key, so browser
//! callers are limited to `AppState::allowed_origins`. CORS only answers for
//! those origins, and `require_allowed_origin` refuses any `/api` request or
//! websocket upgrade whose `Origin` header names another site. Requests with
//! no `Origin` (local tools, the extension's service worker) pass.

pub mod message;
pub mod ws;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let origins = state
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    let api = Router::new()
        .route("/api/message", post(message::post_message))
        .route("/api/ws", get(ws::handle_ws))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_allowed_origin));

    api.route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn require_allowed_origin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(origin) = request.headers().get(ORIGIN) {
        let origin = origin.to_str().unwrap_or_default();
        if !state.origin_allowed(origin) {
            warn!(%origin, path = %request.uri().path(), "rejected request from foreign origin");
            return Err(StatusCode::FORBIDDEN);
        }
    }
    Ok(next.run(request).await)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
