//! # chat-relay
//!
//! Real-time chat relay over WebSocket.
//!
//! Clients hold a persistent WebSocket connection, announce who they are,
//! join conversation rooms, and exchange typing indicators and messages.
//! The relay tracks which users are online, broadcasts the online list on
//! every change, and fans room events out to exactly the room's members.
//! Persistence and authentication live elsewhere; user and room ids are
//! opaque strings here.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler (ws/)       ── decode {event, data} frames
//!     ├── REST Handlers (api/)   ── health, presence snapshot
//!     │
//!     ├── Relay task (relay/)    ── single-owner dispatch loop
//!     │     └── Broadcaster      ── per-connection outbox queues
//!     │
//!     └── Tables (domain/)
//!           ├── PresenceTracker / ConnectionRegistry
//!           ├── RoomMembership
//!           └── TypingTracker
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod relay;
pub mod server;
pub mod ws;
