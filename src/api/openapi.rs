//! OpenAPI document for the HTTP surface.
//!
//! The WebSocket protocol is not expressible in OpenAPI; only the REST
//! endpoints are listed.

use utoipa::OpenApi;

use super::dto::PresenceResponse;
use super::handlers::{presence, system};
use crate::domain::UserId;
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI specification.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "chat-relay", description = "Real-time chat relay: presence, rooms, typing and message fan-out."),
    paths(system::health_handler, presence::get_presence),
    components(schemas(
        system::HealthResponse,
        PresenceResponse,
        UserId,
        ErrorResponse,
        ErrorBody
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "Presence", description = "Online users")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_rest_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/api/v1/presence"));
    }
}
