//! Application assembly: relay task, router, and HTTP server.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::config::RelayConfig;
use crate::relay::Relay;
use crate::ws::handler::ws_handler;

/// Spawns the relay task and builds the application state around it.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn build_state(config: RelayConfig) -> AppState {
    let relay = Relay::spawn(config.command_capacity, config.typing_timeout);
    AppState {
        relay,
        config: Arc::new(config),
    }
}

/// Builds the full router: REST endpoints, `/ws`, tracing, and CORS.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());
    Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves the application on an already bound listener until the
/// server stops.
///
/// # Errors
///
/// Returns an I/O error if the server fails while accepting connections.
pub async fn serve(listener: TcpListener, config: RelayConfig) -> std::io::Result<()> {
    let app = build_app(build_state(config));
    axum::serve(listener, app).await
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };
    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(value))
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!(origin, "invalid CORS_ORIGIN, falling back to permissive");
            CorsLayer::permissive()
        }
    }
}
