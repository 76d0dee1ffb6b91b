//! Active typing indicators with expiry.
//!
//! A lost `stop_typing` would otherwise leave an indicator on screen
//! forever. [`TypingTracker`] remembers who is typing where so the relay
//! can force-clear stale entries and clean up after a disconnect.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use super::{ConnectionId, RoomId};

/// One typing indicator that has been cleared by the tracker and must be
/// announced to the room as `stop_typing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearedTyping {
    /// Room the indicator was shown in.
    pub room: RoomId,
    /// Connection that was typing.
    pub conn_id: ConnectionId,
    /// The `from` value the client announced.
    pub from: String,
}

#[derive(Debug)]
struct TypingEntry {
    from: String,
    last_seen: Instant,
}

/// Typing indicators keyed by `(room, connection)`.
#[derive(Debug, Default)]
pub struct TypingTracker {
    active: HashMap<(RoomId, ConnectionId), TypingEntry>,
}

impl TypingTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or refreshes) a typing indicator.
    pub fn start(&mut self, room: RoomId, conn_id: ConnectionId, from: String, now: Instant) {
        self.active.insert(
            (room, conn_id),
            TypingEntry {
                from,
                last_seen: now,
            },
        );
    }

    /// Clears an indicator. Returns the `from` it was announced with, if
    /// one was active.
    pub fn stop(&mut self, room: RoomId, conn_id: ConnectionId) -> Option<String> {
        self.active.remove(&(room, conn_id)).map(|entry| entry.from)
    }

    /// Removes and returns every indicator not refreshed within `timeout`.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<ClearedTyping> {
        self.drain_where(|_, entry| now.saturating_duration_since(entry.last_seen) >= timeout)
    }

    /// Removes and returns every indicator owned by `conn_id`.
    pub fn clear_connection(&mut self, conn_id: ConnectionId) -> Vec<ClearedTyping> {
        self.drain_where(|(_, owner), _| *owner == conn_id)
    }

    /// Returns the number of active indicators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Returns `true` if nobody is typing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    fn drain_where<F>(&mut self, mut pred: F) -> Vec<ClearedTyping>
    where
        F: FnMut(&(RoomId, ConnectionId), &TypingEntry) -> bool,
    {
        let keys: Vec<(RoomId, ConnectionId)> = self
            .active
            .iter()
            .filter(|&(key, entry)| pred(key, entry))
            .map(|(key, _)| key.clone())
            .collect();

        keys.into_iter()
            .filter_map(|key| {
                let entry = self.active.remove(&key)?;
                let (room, conn_id) = key;
                Some(ClearedTyping {
                    room,
                    conn_id,
                    from: entry.from,
                })
            })
            .collect()
    }
}
