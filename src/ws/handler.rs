//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::{ConnectionSettings, run_connection};
use crate::app_state::AppState;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let relay = state.relay.clone();
    let settings = ConnectionSettings::from(state.config.as_ref());

    ws.max_message_size(state.config.max_message_bytes)
        .on_upgrade(move |socket| run_connection(socket, relay, settings))
}
