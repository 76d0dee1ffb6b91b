//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single WebSocket connection: decodes
//! inbound frames and forwards them to the relay, writes queued outbound
//! events, and keeps the connection alive with pings. However the loop
//! ends, the relay is told the connection is gone.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use super::messages::{decode_client_event, encode_server_event};
use crate::config::RelayConfig;
use crate::domain::ConnectionId;
use crate::error::RelayError;
use crate::relay::RelayHandle;

/// Zero-length intervals are rejected by tokio.
const MIN_PING_INTERVAL: Duration = Duration::from_secs(1);

/// Per-connection tuning taken from [`RelayConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Capacity of the outbound event queue.
    pub outbox_capacity: usize,
    /// Interval between server pings.
    pub ping_interval: Duration,
    /// Close the connection after this long without inbound frames.
    pub idle_timeout: Duration,
}

impl From<&RelayConfig> for ConnectionSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            outbox_capacity: config.outbox_capacity,
            ping_interval: config.ping_interval.max(MIN_PING_INTERVAL),
            idle_timeout: config.idle_timeout,
        }
    }
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads events from the client and forwards them to the relay.
/// - Writes events the relay queued for this connection.
/// - Pings the client and closes idle connections.
pub async fn run_connection(socket: WebSocket, relay: RelayHandle, settings: ConnectionSettings) {
    let conn_id = ConnectionId::new();
    let (outbox, mut inbox) = mpsc::channel(settings.outbox_capacity.max(1));
    if relay.connect(conn_id, outbox).await.is_err() {
        tracing::warn!(conn_id = %conn_id, "relay unavailable, dropping connection");
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut ping = tokio::time::interval_at(
        Instant::now() + settings.ping_interval,
        settings.ping_interval,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_seen = Instant::now();

    tracing::info!(conn_id = %conn_id, "ws connection opened");

    loop {
        tokio::select! {
            // Incoming frame from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = Instant::now();
                        if forward_text(&relay, conn_id, text.as_str()).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => last_seen = Instant::now(),
                    Some(Err(e)) => {
                        tracing::debug!(conn_id = %conn_id, error = %e, "ws receive error");
                        break;
                    }
                }
            }
            // Event queued by the relay
            event = inbox.recv() => {
                let Some(event) = event else {
                    break;
                };
                match encode_server_event(&event) {
                    Ok(json) => {
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(conn_id = %conn_id, error = %e, "dropping unencodable event"),
                }
            }
            _ = ping.tick() => {
                if last_seen.elapsed() >= settings.idle_timeout {
                    tracing::info!(conn_id = %conn_id, "ws connection idle, closing");
                    break;
                }
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    if relay.disconnect(conn_id).await.is_err() {
        tracing::warn!(conn_id = %conn_id, "relay unavailable during disconnect");
    }
    let _ = ws_tx.close().await;

    tracing::info!(conn_id = %conn_id, "ws connection closed");
}

/// Decodes a text frame and forwards it to the relay.
///
/// Bad input from the client is logged and ignored; only a stopped relay
/// is reported as an error.
async fn forward_text(relay: &RelayHandle, conn_id: ConnectionId, text: &str) -> Result<(), RelayError> {
    match decode_client_event(text) {
        Ok(Some(event)) => relay.dispatch(conn_id, event).await,
        Ok(None) => {
            tracing::trace!(conn_id = %conn_id, "ignoring unknown event");
            Ok(())
        }
        Err(e) => {
            tracing::debug!(conn_id = %conn_id, error = %e, "ignoring bad frame");
            Ok(())
        }
    }
}
