//! Relay events: what clients send and what the relay fans out.
//!
//! [`ClientEvent`] is decoded once at the transport boundary (see
//! [`crate::ws::messages`]); [`ServerEvent`] is what gets queued on each
//! recipient's outbox. Field names follow the wire contract exactly
//! (`conversationId`, `roomId`).

use serde::{Deserialize, Serialize};

use super::{RoomId, UserId};

/// Payload of `typing` and `stop_typing`.
///
/// Missing fields decode to their defaults; a missing `conversationId`
/// makes the event a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypingPayload {
    /// Display identity of the typer, forwarded verbatim.
    pub from: String,
    /// Intended recipient. Informational only, routing uses the room.
    pub to: Option<String>,
    /// Room to notify.
    pub conversation_id: Option<RoomId>,
}

/// Payload of `send_message`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendMessagePayload {
    /// Room to deliver into.
    pub room_id: Option<RoomId>,
    /// Opaque message document, relayed without inspection.
    pub message: serde_json::Value,
}

/// Events a client may send to the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Announces the user identity behind this connection.
    UserConnected(UserId),
    /// Joins a conversation room.
    JoinRoom(RoomId),
    /// Leaves a conversation room.
    LeaveRoom(RoomId),
    /// The user started typing.
    Typing(TypingPayload),
    /// The user stopped typing.
    StopTyping(TypingPayload),
    /// A message to relay to a room, sender included.
    SendMessage(SendMessagePayload),
}

impl ClientEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserConnected(_) => "user_connected",
            Self::JoinRoom(_) => "join_room",
            Self::LeaveRoom(_) => "leave_room",
            Self::Typing(_) => "typing",
            Self::StopTyping(_) => "stop_typing",
            Self::SendMessage(_) => "send_message",
        }
    }
}

/// `{ from }` body of the outbound typing notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingNotice {
    /// Who is (or stopped) typing.
    pub from: String,
}

/// Events the relay delivers to clients.
///
/// Serialized as `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full list of online user ids.
    OnlineUsers(Vec<UserId>),
    /// Another room member started typing.
    Typing(TypingNotice),
    /// Another room member stopped typing.
    StopTyping(TypingNotice),
    /// A message posted to a room, verbatim as submitted.
    ReceiveMessage(serde_json::Value),
}

impl ServerEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OnlineUsers(_) => "online_users",
            Self::Typing(_) => "typing",
            Self::StopTyping(_) => "stop_typing",
            Self::ReceiveMessage(_) => "receive_message",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typing_payload_uses_camel_case() {
        let raw = json!({"from": "alice", "to": "bob", "conversationId": "c1"});
        let Ok(payload) = serde_json::from_value::<TypingPayload>(raw) else {
            panic!("typing payload should decode");
        };
        assert_eq!(payload.conversation_id, Some(RoomId::from("c1")));
        assert_eq!(payload.to.as_deref(), Some("bob"));
    }

    #[test]
    fn send_message_without_room_decodes_to_none() {
        let raw = json!({"message": {"content": "hi"}});
        let Ok(payload) = serde_json::from_value::<SendMessagePayload>(raw) else {
            panic!("payload should decode");
        };
        assert!(payload.room_id.is_none());
        assert_eq!(payload.message, json!({"content": "hi"}));
    }

    #[test]
    fn online_users_serializes_as_tagged_frame() {
        let event = ServerEvent::OnlineUsers(vec![UserId::from("a"), UserId::from("b")]);
        let value = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(value, json!({"event": "online_users", "data": ["a", "b"]}));
    }

    #[test]
    fn receive_message_keeps_message_verbatim() {
        let message = json!({
            "conversationId": "c1",
            "senderId": "u1",
            "content": "hi",
            "attachments": [{"url": "https://x/y.png", "fileName": "y.png", "fileType": "image/png", "publicId": "p"}],
            "createdAt": "2024-01-01T00:00:00Z"
        });
        let event = ServerEvent::ReceiveMessage(message.clone());
        let value = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(value, json!({"event": "receive_message", "data": message}));
    }

    #[test]
    fn typing_notice_carries_only_from() {
        let event = ServerEvent::StopTyping(TypingNotice { from: "a".into() });
        let value = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(value, json!({"event": "stop_typing", "data": {"from": "a"}}));
        assert_eq!(event.name(), "stop_typing");
    }
}
