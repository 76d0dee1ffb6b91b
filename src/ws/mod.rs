//! WebSocket layer: upgrade handler, connection loop, frame codec.
//!
//! The WebSocket endpoint at `/ws` carries the relay's named events in
//! both directions, one JSON `{event, data}` object per text frame.

pub mod connection;
pub mod handler;
pub mod messages;
