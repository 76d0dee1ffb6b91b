//! Connection registry: user identity → live connections.
//!
//! A user may hold several simultaneous connections (tabs, devices). The
//! registry keeps the forward map used to derive presence and a reverse
//! `connection → user` index so that deregistration does not have to scan
//! every entry.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{ConnectionId, UserId};

/// Tracks which connections back which user identity.
///
/// # Invariants
///
/// - A user is present in `users` iff its connection set is non-empty.
/// - `owners[c] == u` iff `users[u]` contains `c`.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    users: BTreeMap<UserId, HashSet<ConnectionId>>,
    owners: HashMap<ConnectionId, UserId>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `conn_id` with `user_id`, creating the entry if absent.
    ///
    /// Idempotent for a repeated `(user, connection)` pair. A connection
    /// announcing a different identity is moved to the new one.
    ///
    /// Returns `true` if the registry changed.
    pub fn register(&mut self, user_id: UserId, conn_id: ConnectionId) -> bool {
        match self.owners.entry(conn_id) {
            Entry::Occupied(mut owner) => {
                if *owner.get() == user_id {
                    return false;
                }
                let previous = owner.insert(user_id.clone());
                Self::remove_from(&mut self.users, &previous, conn_id);
            }
            Entry::Vacant(slot) => {
                slot.insert(user_id.clone());
            }
        }
        self.users.entry(user_id).or_default().insert(conn_id);
        true
    }

    /// Removes `conn_id` from whichever user entry holds it.
    ///
    /// Returns the user identity if this was its last connection (the user
    /// just went offline). Unknown connections are a no-op.
    pub fn deregister(&mut self, conn_id: ConnectionId) -> Option<UserId> {
        let user_id = self.owners.remove(&conn_id)?;
        Self::remove_from(&mut self.users, &user_id, conn_id).then_some(user_id)
    }

    /// Returns every user identity with at least one live connection.
    ///
    /// The list is sorted; callers must not rely on the order.
    #[must_use]
    pub fn online_user_ids(&self) -> Vec<UserId> {
        self.users.keys().cloned().collect()
    }

    /// Returns `true` if the user has at least one live connection.
    #[must_use]
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.users.contains_key(user_id)
    }

    /// Returns the number of online users.
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.users.len()
    }

    /// Removes `conn_id` from `user_id`'s set, dropping the entry when it
    /// empties. Returns `true` if the entry was dropped.
    fn remove_from(
        users: &mut BTreeMap<UserId, HashSet<ConnectionId>>,
        user_id: &UserId,
        conn_id: ConnectionId,
    ) -> bool {
        let Some(conns) = users.get_mut(user_id) else {
            return false;
        };
        conns.remove(&conn_id);
        if conns.is_empty() {
            users.remove(user_id);
            return true;
        }
        false
    }
}
