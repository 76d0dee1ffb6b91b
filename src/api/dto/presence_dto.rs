//! Presence snapshot DTO.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::UserId;
use crate::relay::RelayStats;

/// Response body for `GET /api/v1/presence`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PresenceResponse {
    /// Users with at least one live connection, same list as the
    /// `online_users` WebSocket event.
    pub online_users: Vec<UserId>,
    /// Live WebSocket connections, identified or not.
    pub connections: usize,
    /// Rooms with at least one member.
    pub rooms: usize,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl From<RelayStats> for PresenceResponse {
    fn from(stats: RelayStats) -> Self {
        Self {
            online_users: stats.online_users,
            connections: stats.connections,
            rooms: stats.rooms,
            timestamp: Utc::now(),
        }
    }
}
