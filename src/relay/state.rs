//! The relay's owned state and its event handlers.
//!
//! [`RelayState`] is only ever touched by the relay task, one command at a
//! time, so every mutation and the fan-out it triggers happen in a single
//! total order without locks.

use std::time::Duration;

use tokio::time::Instant;

use super::fanout::{Broadcaster, Outbox};
use crate::domain::{
    ClearedTyping, ClientEvent, ConnectionId, PresenceTracker, RoomId, RoomMembership,
    SendMessagePayload, ServerEvent, TypingNotice, TypingPayload, TypingTracker, UserId,
};

/// Point-in-time counters exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayStats {
    /// Users with at least one live connection.
    pub online_users: Vec<UserId>,
    /// Attached connections, identified or not.
    pub connections: usize,
    /// Rooms with at least one member.
    pub rooms: usize,
}

/// All mutable relay state.
#[derive(Debug, Default)]
pub struct RelayState {
    presence: PresenceTracker,
    rooms: RoomMembership,
    typing: TypingTracker,
    fanout: Broadcaster,
}

impl RelayState {
    /// Creates empty relay state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a freshly accepted connection.
    pub fn connect(&mut self, conn_id: ConnectionId, outbox: Outbox) {
        self.fanout.attach(conn_id, outbox);
        tracing::debug!(conn_id = %conn_id, connections = self.fanout.len(), "connection attached");
    }

    /// Routes one client event.
    pub fn dispatch(&mut self, conn_id: ConnectionId, event: ClientEvent, now: Instant) {
        tracing::trace!(conn_id = %conn_id, event = event.name(), "dispatch");
        match event {
            ClientEvent::UserConnected(user_id) => self.on_user_connected(conn_id, user_id),
            ClientEvent::JoinRoom(room) => self.on_join(conn_id, room),
            ClientEvent::LeaveRoom(room) => self.on_leave(conn_id, &room),
            ClientEvent::Typing(payload) => self.on_typing(conn_id, payload, now),
            ClientEvent::StopTyping(payload) => self.on_stop_typing(conn_id, payload),
            ClientEvent::SendMessage(payload) => self.on_send_message(conn_id, payload),
        }
    }

    /// Tears down a closed connection: typing state, rooms, presence.
    ///
    /// Runs to completion before the next command, so the connection is
    /// never a fan-out target afterwards.
    pub fn disconnect(&mut self, conn_id: ConnectionId) {
        self.fanout.detach(conn_id);
        let cleared = self.typing.clear_connection(conn_id);
        self.announce_cleared(cleared);
        let rooms = self.rooms.leave_all(conn_id);
        let snapshot = self.presence.connection_closed(conn_id);
        self.broadcast_presence(snapshot);
        tracing::debug!(
            conn_id = %conn_id,
            rooms_left = rooms.len(),
            connections = self.fanout.len(),
            "connection detached"
        );
    }

    /// Force-clears typing indicators idle for at least `timeout`.
    pub fn expire_typing(&mut self, now: Instant, timeout: Duration) {
        let cleared = self.typing.expire(now, timeout);
        if !cleared.is_empty() {
            tracing::debug!(count = cleared.len(), "expired stale typing indicators");
        }
        self.announce_cleared(cleared);
    }

    /// Queues `event` for every member of `room` except `exclude`.
    ///
    /// Returns the number of recipients. An empty room is not an error.
    pub fn broadcast(&self, room: &RoomId, event: &ServerEvent, exclude: Option<ConnectionId>) -> usize {
        self.fanout.deliver_to(self.rooms.members(room), exclude, event)
    }

    /// Returns current counters.
    #[must_use]
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            online_users: self.presence.online_user_ids(),
            connections: self.fanout.len(),
            rooms: self.rooms.room_count(),
        }
    }

    fn on_user_connected(&mut self, conn_id: ConnectionId, user_id: UserId) {
        let snapshot = self.presence.user_connected(user_id, conn_id);
        self.broadcast_presence(snapshot);
    }

    fn on_join(&mut self, conn_id: ConnectionId, room: RoomId) {
        if room.is_empty() {
            return;
        }
        if self.rooms.join(conn_id, room.clone()) {
            tracing::debug!(conn_id = %conn_id, room = %room, "joined room");
        }
    }

    fn on_leave(&mut self, conn_id: ConnectionId, room: &RoomId) {
        if self.rooms.leave(conn_id, room) {
            tracing::debug!(conn_id = %conn_id, room = %room, "left room");
        }
        if let Some(from) = self.typing.stop(room.clone(), conn_id) {
            tracing::trace!(conn_id = %conn_id, room = %room, "typing cleared on leave");
            let event = ServerEvent::StopTyping(TypingNotice { from });
            self.broadcast(room, &event, Some(conn_id));
        }
    }

    fn on_typing(&mut self, conn_id: ConnectionId, payload: TypingPayload, now: Instant) {
        let Some(room) = routable(payload.conversation_id) else {
            return;
        };
        // Only members get an entry; the table stays bounded by memberships.
        if self.rooms.contains(conn_id, &room) {
            self.typing.start(room.clone(), conn_id, payload.from.clone(), now);
        }
        let event = ServerEvent::Typing(TypingNotice { from: payload.from });
        self.broadcast(&room, &event, Some(conn_id));
    }

    fn on_stop_typing(&mut self, conn_id: ConnectionId, payload: TypingPayload) {
        let Some(room) = routable(payload.conversation_id) else {
            return;
        };
        self.typing.stop(room.clone(), conn_id);
        let event = ServerEvent::StopTyping(TypingNotice { from: payload.from });
        self.broadcast(&room, &event, Some(conn_id));
    }

    fn on_send_message(&mut self, conn_id: ConnectionId, payload: SendMessagePayload) {
        let Some(room) = routable(payload.room_id) else {
            return;
        };
        let event = ServerEvent::ReceiveMessage(payload.message);
        let delivered = self.broadcast(&room, &event, None);
        tracing::debug!(conn_id = %conn_id, room = %room, delivered, "message relayed");
    }

    fn broadcast_presence(&self, snapshot: Vec<UserId>) {
        let online = snapshot.len();
        let delivered = self.fanout.broadcast_all(&ServerEvent::OnlineUsers(snapshot));
        tracing::debug!(online, delivered, "presence broadcast");
    }

    fn announce_cleared(&self, cleared: Vec<ClearedTyping>) {
        for entry in cleared {
            let event = ServerEvent::StopTyping(TypingNotice { from: entry.from });
            self.broadcast(&entry.room, &event, Some(entry.conn_id));
        }
    }
}

/// Absent and empty room ids are not routable.
fn routable(room: Option<RoomId>) -> Option<RoomId> {
    room.filter(|r| !r.is_empty())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    struct Client {
        id: ConnectionId,
        rx: mpsc::Receiver<ServerEvent>,
    }

    impl Client {
        fn drain(&mut self) -> Vec<ServerEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                out.push(event);
            }
            out
        }
    }

    fn connect(state: &mut RelayState) -> Client {
        let (tx, rx) = mpsc::channel(64);
        let id = ConnectionId::new();
        state.connect(id, tx);
        Client { id, rx }
    }

    fn send(state: &mut RelayState, client: &Client, event: ClientEvent) {
        state.dispatch(client.id, event, Instant::now());
    }

    fn typing(from: &str, room: &str) -> TypingPayload {
        TypingPayload {
            from: from.into(),
            to: None,
            conversation_id: Some(RoomId::from(room)),
        }
    }

    fn message(room: &str, body: serde_json::Value) -> ClientEvent {
        ClientEvent::SendMessage(SendMessagePayload {
            room_id: Some(RoomId::from(room)),
            message: body,
        })
    }

    fn users(names: &[&str]) -> ServerEvent {
        ServerEvent::OnlineUsers(names.iter().map(|n| UserId::from(*n)).collect())
    }

    /// Two users, both identified and in room `R1`, with queues drained.
    fn two_users_in_room(state: &mut RelayState) -> (Client, Client) {
        let mut a1 = connect(state);
        let mut b1 = connect(state);
        send(state, &a1, ClientEvent::UserConnected(UserId::from("A")));
        send(state, &b1, ClientEvent::UserConnected(UserId::from("B")));
        send(state, &a1, ClientEvent::JoinRoom(RoomId::from("R1")));
        send(state, &b1, ClientEvent::JoinRoom(RoomId::from("R1")));
        a1.drain();
        b1.drain();
        (a1, b1)
    }

    #[test]
    fn user_connected_broadcasts_to_everyone() {
        let mut state = RelayState::new();
        let mut a = connect(&mut state);
        let mut anonymous = connect(&mut state);

        send(&mut state, &a, ClientEvent::UserConnected(UserId::from("A")));

        assert_eq!(a.drain(), vec![users(&["A"])]);
        assert_eq!(anonymous.drain(), vec![users(&["A"])]);
    }

    #[test]
    fn typing_excludes_sender() {
        let mut state = RelayState::new();
        let (mut a1, mut b1) = two_users_in_room(&mut state);

        send(&mut state, &a1, ClientEvent::Typing(typing("A", "R1")));

        assert!(a1.drain().is_empty());
        assert_eq!(
            b1.drain(),
            vec![ServerEvent::Typing(TypingNotice { from: "A".into() })]
        );
    }

    #[test]
    fn stop_typing_excludes_sender() {
        let mut state = RelayState::new();
        let (mut a1, mut b1) = two_users_in_room(&mut state);

        send(&mut state, &b1, ClientEvent::StopTyping(typing("B", "R1")));

        assert_eq!(
            a1.drain(),
            vec![ServerEvent::StopTyping(TypingNotice { from: "B".into() })]
        );
        assert!(b1.drain().is_empty());
    }

    #[test]
    fn send_message_includes_sender() {
        let mut state = RelayState::new();
        let (mut a1, mut b1) = two_users_in_room(&mut state);

        send(&mut state, &b1, message("R1", json!({"content": "hi"})));

        let expected = vec![ServerEvent::ReceiveMessage(json!({"content": "hi"}))];
        assert_eq!(a1.drain(), expected);
        assert_eq!(b1.drain(), expected);
    }

    #[test]
    fn send_message_to_unjoined_room_reaches_nobody() {
        let mut state = RelayState::new();
        let (mut a1, mut b1) = two_users_in_room(&mut state);
        let mut loner = connect(&mut state);

        send(&mut state, &loner, message("elsewhere", json!({"content": "x"})));

        assert!(loner.drain().is_empty());
        assert!(a1.drain().is_empty());
        assert!(b1.drain().is_empty());
    }

    #[test]
    fn missing_room_is_noop() {
        let mut state = RelayState::new();
        let (mut a1, mut b1) = two_users_in_room(&mut state);

        send(
            &mut state,
            &a1,
            ClientEvent::SendMessage(SendMessagePayload {
                room_id: None,
                message: json!({"content": "lost"}),
            }),
        );
        send(&mut state, &a1, ClientEvent::Typing(TypingPayload::default()));
        send(&mut state, &a1, ClientEvent::JoinRoom(RoomId::from("")));

        assert!(a1.drain().is_empty());
        assert!(b1.drain().is_empty());
        assert_eq!(state.stats().rooms, 1);
    }

    #[test]
    fn events_stay_inside_their_room() {
        let mut state = RelayState::new();
        let (mut a1, mut b1) = two_users_in_room(&mut state);
        let mut c1 = connect(&mut state);
        send(&mut state, &c1, ClientEvent::JoinRoom(RoomId::from("R2")));
        c1.drain();

        send(&mut state, &a1, message("R1", json!({"content": "r1 only"})));

        assert_eq!(a1.drain().len(), 1);
        assert_eq!(b1.drain().len(), 1);
        assert!(c1.drain().is_empty());
    }

    #[test]
    fn leave_room_stops_delivery_for_that_room_only() {
        let mut state = RelayState::new();
        let (mut a1, mut b1) = two_users_in_room(&mut state);
        send(&mut state, &b1, ClientEvent::JoinRoom(RoomId::from("R2")));
        send(&mut state, &a1, ClientEvent::JoinRoom(RoomId::from("R2")));

        send(&mut state, &b1, ClientEvent::LeaveRoom(RoomId::from("R1")));
        send(&mut state, &a1, message("R1", json!({"n": 1})));
        send(&mut state, &a1, message("R2", json!({"n": 2})));

        assert_eq!(a1.drain().len(), 2);
        assert_eq!(
            b1.drain(),
            vec![ServerEvent::ReceiveMessage(json!({"n": 2}))]
        );
    }

    #[test]
    fn disconnected_connection_receives_nothing_further() {
        let mut state = RelayState::new();
        let (mut a1, mut b1) = two_users_in_room(&mut state);

        state.disconnect(b1.id);
        assert_eq!(a1.drain(), vec![users(&["A"])]);

        send(&mut state, &a1, message("R1", json!({"content": "anyone?"})));
        assert!(b1.drain().is_empty());
        assert_eq!(a1.drain().len(), 1);
        assert_eq!(state.stats().connections, 1);
    }

    #[test]
    fn two_tabs_presence_scenario() {
        let mut state = RelayState::new();
        let a1 = connect(&mut state);
        let a2 = connect(&mut state);
        let mut observer = connect(&mut state);
        send(&mut state, &a1, ClientEvent::UserConnected(UserId::from("A")));
        send(&mut state, &a2, ClientEvent::UserConnected(UserId::from("A")));
        observer.drain();

        state.disconnect(a1.id);
        assert_eq!(observer.drain(), vec![users(&["A"])]);

        state.disconnect(a2.id);
        assert_eq!(observer.drain(), vec![users(&[])]);
    }

    #[test]
    fn repeated_identity_is_idempotent() {
        let mut state = RelayState::new();
        let mut a1 = connect(&mut state);
        send(&mut state, &a1, ClientEvent::UserConnected(UserId::from("A")));
        send(&mut state, &a1, ClientEvent::UserConnected(UserId::from("A")));

        assert_eq!(a1.drain(), vec![users(&["A"]), users(&["A"])]);
        assert_eq!(state.stats().online_users, vec![UserId::from("A")]);
    }

    #[test]
    fn disconnect_clears_typing_for_room_members() {
        let mut state = RelayState::new();
        let (a1, mut b1) = two_users_in_room(&mut state);

        send(&mut state, &a1, ClientEvent::Typing(typing("A", "R1")));
        b1.drain();

        state.disconnect(a1.id);
        assert_eq!(
            b1.drain(),
            vec![
                ServerEvent::StopTyping(TypingNotice { from: "A".into() }),
                users(&["B"]),
            ]
        );
    }

    #[test]
    fn leave_room_clears_typing_for_remaining_members() {
        let mut state = RelayState::new();
        let (a1, mut b1) = two_users_in_room(&mut state);
        let t0 = Instant::now();

        state.dispatch(a1.id, ClientEvent::Typing(typing("A", "R1")), t0);
        b1.drain();

        state.dispatch(a1.id, ClientEvent::LeaveRoom(RoomId::from("R1")), t0);
        assert_eq!(
            b1.drain(),
            vec![ServerEvent::StopTyping(TypingNotice { from: "A".into() })]
        );

        // Nothing left for the sweep to announce twice.
        state.expire_typing(t0 + Duration::from_secs(60), Duration::from_secs(5));
        assert!(b1.drain().is_empty());
    }

    #[test]
    fn leave_room_without_typing_is_silent() {
        let mut state = RelayState::new();
        let (a1, mut b1) = two_users_in_room(&mut state);

        send(&mut state, &a1, ClientEvent::LeaveRoom(RoomId::from("R1")));
        assert!(b1.drain().is_empty());
    }

    #[test]
    fn typing_from_non_member_is_relayed_but_not_tracked() {
        let mut state = RelayState::new();
        let (a1, mut b1) = two_users_in_room(&mut state);
        let mut outsider = connect(&mut state);
        outsider.drain();
        let t0 = Instant::now();

        state.dispatch(outsider.id, ClientEvent::Typing(typing("O", "R1")), t0);
        state.dispatch(a1.id, ClientEvent::Typing(typing("A", "R2")), t0);
        assert_eq!(
            b1.drain(),
            vec![ServerEvent::Typing(TypingNotice { from: "O".into() })]
        );

        state.expire_typing(t0 + Duration::from_secs(60), Duration::from_secs(5));
        assert!(b1.drain().is_empty());
        assert!(outsider.drain().is_empty());
    }

    #[test]
    fn stale_typing_is_force_cleared() {
        let mut state = RelayState::new();
        let (a1, mut b1) = two_users_in_room(&mut state);
        let t0 = Instant::now();

        state.dispatch(a1.id, ClientEvent::Typing(typing("A", "R1")), t0);
        b1.drain();

        state.expire_typing(t0 + Duration::from_secs(1), Duration::from_secs(5));
        assert!(b1.drain().is_empty());

        state.expire_typing(t0 + Duration::from_secs(6), Duration::from_secs(5));
        assert_eq!(
            b1.drain(),
            vec![ServerEvent::StopTyping(TypingNotice { from: "A".into() })]
        );
    }

    #[test]
    fn stats_reflect_tables() {
        let mut state = RelayState::new();
        let (_a1, _b1) = two_users_in_room(&mut state);
        let _anon = connect(&mut state);

        let stats = state.stats();
        assert_eq!(stats.online_users, vec![UserId::from("A"), UserId::from("B")]);
        assert_eq!(stats.connections, 3);
        assert_eq!(stats.rooms, 1);
    }
}
