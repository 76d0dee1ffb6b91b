//! Presence handlers.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::PresenceResponse;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};

/// `GET /presence` — Current online users and relay counters.
///
/// # Errors
///
/// Returns [`RelayError::RelayUnavailable`] if the relay task has stopped.
#[utoipa::path(
    get,
    path = "/api/v1/presence",
    tag = "Presence",
    summary = "Online users snapshot",
    description = "Returns the users with at least one live WebSocket connection, plus connection and room counts.",
    responses(
        (status = 200, description = "Current presence", body = PresenceResponse),
        (status = 503, description = "Relay not running", body = ErrorResponse),
    )
)]
pub async fn get_presence(State(state): State<AppState>) -> Result<impl IntoResponse, RelayError> {
    let stats = state.relay.stats().await?;
    Ok(Json(PresenceResponse::from(stats)))
}

/// Presence routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/presence", get(get_presence))
}
