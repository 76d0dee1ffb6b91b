//! Presence tracking on top of the connection registry.
//!
//! Every registry mutation yields a full snapshot of the online users which
//! the relay broadcasts to all connections as `online_users`. Snapshots are
//! full state rather than deltas.

use super::{ConnectionId, ConnectionRegistry, UserId};

/// Derives online presence from a [`ConnectionRegistry`].
#[derive(Debug, Default)]
pub struct PresenceTracker {
    registry: ConnectionRegistry,
}

impl PresenceTracker {
    /// Creates a tracker with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `conn_id` under `user_id` and returns the snapshot to
    /// broadcast.
    ///
    /// A repeated announcement still produces a snapshot so a client that
    /// re-announces itself receives the current list.
    pub fn user_connected(&mut self, user_id: UserId, conn_id: ConnectionId) -> Vec<UserId> {
        let was_online = self.registry.is_online(&user_id);
        if self.registry.register(user_id.clone(), conn_id) && !was_online {
            tracing::info!(user_id = %user_id, conn_id = %conn_id, "user online");
        }
        self.online_user_ids()
    }

    /// Deregisters `conn_id` and returns the snapshot to broadcast.
    pub fn connection_closed(&mut self, conn_id: ConnectionId) -> Vec<UserId> {
        if let Some(user_id) = self.registry.deregister(conn_id) {
            tracing::info!(user_id = %user_id, conn_id = %conn_id, "user offline");
        }
        self.online_user_ids()
    }

    /// Returns the current online user list.
    #[must_use]
    pub fn online_user_ids(&self) -> Vec<UserId> {
        self.registry.online_user_ids()
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_includes_new_user() {
        let mut presence = PresenceTracker::new();
        let snapshot = presence.user_connected(UserId::from("alice"), ConnectionId::new());
        assert_eq!(snapshot, vec![UserId::from("alice")]);
    }

    #[test]
    fn repeated_announcement_still_yields_snapshot() {
        let mut presence = PresenceTracker::new();
        let c = ConnectionId::new();
        presence.user_connected(UserId::from("alice"), c);
        let snapshot = presence.user_connected(UserId::from("alice"), c);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn two_tabs_scenario() {
        let mut presence = PresenceTracker::new();
        let (a1, a2) = (ConnectionId::new(), ConnectionId::new());
        presence.user_connected(UserId::from("A"), a1);
        presence.user_connected(UserId::from("A"), a2);

        assert_eq!(presence.connection_closed(a1), vec![UserId::from("A")]);
        assert!(presence.connection_closed(a2).is_empty());
    }

    #[test]
    fn anonymous_close_keeps_others_online() {
        let mut presence = PresenceTracker::new();
        presence.user_connected(UserId::from("bob"), ConnectionId::new());
        let snapshot = presence.connection_closed(ConnectionId::new());
        assert_eq!(snapshot, vec![UserId::from("bob")]);
        assert_eq!(presence.registry().online_count(), 1);
    }
}
