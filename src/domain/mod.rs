//! Domain layer: identifiers, relay events, and the in-memory tables.
//!
//! This module contains the relay's state model: connection and room
//! identifiers, the client/server event types, the connection registry
//! and the presence tracker built on it, room membership, and typing
//! indicators. None of these types perform I/O; the relay task in
//! [`crate::relay`] owns them and drives all mutations.

pub mod connection_id;
pub mod event;
pub mod ids;
pub mod presence;
pub mod registry;
pub mod rooms;
pub mod typing;

pub use connection_id::ConnectionId;
pub use event::{ClientEvent, SendMessagePayload, ServerEvent, TypingNotice, TypingPayload};
pub use ids::{RoomId, UserId};
pub use presence::PresenceTracker;
pub use registry::ConnectionRegistry;
pub use rooms::RoomMembership;
pub use typing::{ClearedTyping, TypingTracker};
