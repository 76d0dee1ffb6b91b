//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::relay::RelayHandle;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the relay task.
    pub relay: RelayHandle,
    /// Configuration the server was started with.
    pub config: Arc<RelayConfig>,
}
