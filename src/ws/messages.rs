//! WebSocket frame envelope and event codec.
//!
//! Every text frame carries exactly one event:
//!
//! ```json
//! { "event": "send_message", "data": { "roomId": "c1", "message": { ... } } }
//! ```
//!
//! Inbound frames are decoded once here into a typed [`ClientEvent`];
//! nothing past this module sees untyped payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{ClientEvent, ServerEvent};
use crate::error::RelayError;

/// Top-level WebSocket frame envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsFrame {
    /// Event name.
    pub event: String,
    /// Event-specific payload. Absent data decodes as `null`.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Decodes one inbound text frame.
///
/// Returns `Ok(None)` for event names the relay does not know, so newer
/// clients can talk to an older relay.
///
/// # Errors
///
/// Returns [`RelayError::MalformedFrame`] if the text is not an envelope
/// and [`RelayError::InvalidPayload`] if a known event carries a payload
/// of the wrong shape.
pub fn decode_client_event(text: &str) -> Result<Option<ClientEvent>, RelayError> {
    let frame: WsFrame = serde_json::from_str(text).map_err(RelayError::MalformedFrame)?;
    let data = frame.data;

    let event = match frame.event.as_str() {
        "user_connected" => ClientEvent::UserConnected(payload("user_connected", data)?),
        "join_room" => ClientEvent::JoinRoom(payload("join_room", data)?),
        "leave_room" => ClientEvent::LeaveRoom(payload("leave_room", data)?),
        "typing" => ClientEvent::Typing(payload("typing", data)?),
        "stop_typing" => ClientEvent::StopTyping(payload("stop_typing", data)?),
        "send_message" => ClientEvent::SendMessage(payload("send_message", data)?),
        _ => return Ok(None),
    };
    Ok(Some(event))
}

/// Encodes an outbound event as frame text.
///
/// # Errors
///
/// Returns [`RelayError::Internal`] if serialization fails.
pub fn encode_server_event(event: &ServerEvent) -> Result<String, RelayError> {
    serde_json::to_string(event).map_err(|e| RelayError::Internal(e.to_string()))
}

/// Decodes the payload of `event`. A missing payload is read as `{}` so
/// object payloads fall back to their field defaults.
fn payload<T: DeserializeOwned>(
    event: &'static str,
    data: serde_json::Value,
) -> Result<T, RelayError> {
    let data = if data.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        data
    };
    serde_json::from_value(data).map_err(|source| RelayError::InvalidPayload { event, source })
}
