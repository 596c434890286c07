//! One-shot envelope endpoint for surfaces that do not hold a socket open
//! (options page, connection test).

use axum::Json;
use axum::extract::State;

use crate::envelope::{Inbound, Outbound};
use crate::state::AppState;

/// `POST /api/message`: one envelope in, one envelope out. Routing errors
/// come back in the body with status 200.
pub async fn post_message(State(state): State<AppState>, Json(inbound): Json<Inbound>) -> Json<Outbound> {
    Json(state.router.dispatch_isolated(inbound).await)
}
