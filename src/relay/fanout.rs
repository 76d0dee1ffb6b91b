//! Outbound queues and fire-and-forget fan-out.
//!
//! Each live connection owns a bounded [`mpsc`] queue drained by its
//! WebSocket writer. The relay only ever uses `try_send`, so a slow or
//! dead client can never stall dispatch: its events are dropped instead.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::domain::{ConnectionId, ServerEvent};

/// Sending half of a connection's outbound queue.
pub type Outbox = mpsc::Sender<ServerEvent>;

/// Registry of outbound queues keyed by connection.
#[derive(Debug, Default)]
pub struct Broadcaster {
    outboxes: HashMap<ConnectionId, Outbox>,
}

impl Broadcaster {
    /// Creates a broadcaster with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the outbound queue of a freshly accepted connection.
    pub fn attach(&mut self, conn_id: ConnectionId, outbox: Outbox) {
        self.outboxes.insert(conn_id, outbox);
    }

    /// Detaches a connection. Returns `false` if it was not attached.
    pub fn detach(&mut self, conn_id: ConnectionId) -> bool {
        self.outboxes.remove(&conn_id).is_some()
    }

    /// Returns the number of attached connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    /// Returns `true` if no connection is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }

    /// Queues `event` for every attached connection.
    ///
    /// Returns the number of connections the event was queued for.
    pub fn broadcast_all(&self, event: &ServerEvent) -> usize {
        self.outboxes
            .iter()
            .filter(|(conn_id, outbox)| deliver(**conn_id, outbox, event))
            .count()
    }

    /// Queues `event` for each of `targets` except `exclude`.
    ///
    /// Targets without an attached outbox are skipped. Returns the number
    /// of connections the event was queued for.
    pub fn deliver_to<I>(&self, targets: I, exclude: Option<ConnectionId>, event: &ServerEvent) -> usize
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        targets
            .into_iter()
            .filter(|conn_id| Some(*conn_id) != exclude)
            .filter_map(|conn_id| self.outboxes.get(&conn_id).map(|o| (conn_id, o)))
            .filter(|(conn_id, outbox)| deliver(*conn_id, outbox, event))
            .count()
    }
}

fn deliver(conn_id: ConnectionId, outbox: &Outbox, event: &ServerEvent) -> bool {
    match outbox.try_send(event.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(conn_id = %conn_id, event = event.name(), "outbox full, dropping event");
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(conn_id = %conn_id, event = event.name(), "outbox closed");
            false
        }
    }
}
