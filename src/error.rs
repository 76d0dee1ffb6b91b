//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type. WebSocket-side errors are
//! logged and swallowed by the connection task; HTTP-side errors are
//! rendered as a structured JSON body via [`IntoResponse`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3002,
///     "message": "relay is not running",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Relay error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category    | HTTP Status               |
/// |-----------|-------------|---------------------------|
/// | 1000–1999 | Protocol    | 400 Bad Request           |
/// | 3000–3999 | Server      | 500 / 503                 |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Frame is not a `{event, data}` JSON object.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    /// Frame names a known event but its payload has the wrong shape.
    #[error("invalid payload for `{event}`: {source}")]
    InvalidPayload {
        /// Event name the payload belonged to.
        event: &'static str,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// The relay task has shut down and no longer accepts commands.
    #[error("relay is not running")]
    RelayUnavailable,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MalformedFrame(_) => 1001,
            Self::InvalidPayload { .. } => 1002,
            Self::Internal(_) => 3000,
            Self::RelayUnavailable => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedFrame(_) | Self::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            Self::RelayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
