//! Room membership table.
//!
//! Tracks which connections joined which conversation rooms, together with
//! the reverse `connection → rooms` index used for disconnect cleanup.

use std::collections::{HashMap, HashSet};

use super::{ConnectionId, RoomId};

/// Bidirectional room ↔ connection index.
///
/// Empty rooms and connections without rooms are dropped from the maps so
/// the table only ever holds live memberships.
#[derive(Debug, Default)]
pub struct RoomMembership {
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
    joined: HashMap<ConnectionId, HashSet<RoomId>>,
}

impl RoomMembership {
    /// Creates an empty membership table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `conn_id` to `room`. Returns `false` if it was already a member.
    pub fn join(&mut self, conn_id: ConnectionId, room: RoomId) -> bool {
        let inserted = self.rooms.entry(room.clone()).or_default().insert(conn_id);
        self.joined.entry(conn_id).or_default().insert(room);
        inserted
    }

    /// Removes `conn_id` from `room` only. Returns `false` if it was not a
    /// member.
    pub fn leave(&mut self, conn_id: ConnectionId, room: &RoomId) -> bool {
        let removed = detach(&mut self.rooms, room, &conn_id);
        detach(&mut self.joined, &conn_id, room);
        removed
    }

    /// Removes `conn_id` from every room it joined, returning those rooms.
    pub fn leave_all(&mut self, conn_id: ConnectionId) -> Vec<RoomId> {
        let Some(rooms) = self.joined.remove(&conn_id) else {
            return Vec::new();
        };
        for room in &rooms {
            detach(&mut self.rooms, room, &conn_id);
        }
        rooms.into_iter().collect()
    }

    /// Returns a snapshot of the connections currently in `room`.
    #[must_use]
    pub fn members(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if `conn_id` is a member of `room`.
    #[must_use]
    pub fn contains(&self, conn_id: ConnectionId, room: &RoomId) -> bool {
        self.rooms.get(room).is_some_and(|m| m.contains(&conn_id))
    }

    /// Returns the number of non-empty rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Removes `value` from the set under `key`, dropping the key when the set
/// empties.
fn detach<K, V>(map: &mut HashMap<K, HashSet<V>>, key: &K, value: &V) -> bool
where
    K: std::hash::Hash + Eq,
    V: std::hash::Hash + Eq,
{
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(value);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}
