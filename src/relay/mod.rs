//! The relay task: single-owner dispatch loop over [`RelayState`].
//!
//! Connection tasks never touch relay state directly. They send
//! [`RelayCommand`]s through a [`RelayHandle`]; the relay task applies them
//! one at a time, which gives a total order over every registry, room and
//! presence transition and the fan-out it triggers.
//!
//! ```text
//! ws task ─┐
//! ws task ─┼─ mpsc<RelayCommand> ─→ Relay::run ─→ RelayState
//! ws task ─┘                                        │
//!    ▲                                              │ try_send
//!    └──────────── mpsc<ServerEvent> (outbox) ◀─────┘
//! ```

pub mod fanout;
pub mod state;

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};

pub use fanout::{Broadcaster, Outbox};
pub use state::{RelayState, RelayStats};

use crate::domain::{ClientEvent, ConnectionId};
use crate::error::RelayError;

/// Lower bound on the typing sweep period.
const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(250);

/// Messages accepted by the relay task.
#[derive(Debug)]
pub enum RelayCommand {
    /// A transport session was accepted.
    Connect {
        /// Identifier assigned at accept time.
        conn_id: ConnectionId,
        /// Queue the relay writes outbound events to.
        outbox: Outbox,
    },
    /// A decoded client event.
    Event {
        /// Originating connection.
        conn_id: ConnectionId,
        /// The event itself.
        event: ClientEvent,
    },
    /// The transport session closed.
    Disconnect {
        /// Closed connection.
        conn_id: ConnectionId,
    },
    /// Request a stats snapshot.
    Stats {
        /// Reply channel.
        reply: oneshot::Sender<RelayStats>,
    },
}

/// Cloneable handle used to feed commands into the relay task.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    sender: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Attaches a new connection and its outbound queue.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the relay task stopped.
    pub async fn connect(&self, conn_id: ConnectionId, outbox: Outbox) -> Result<(), RelayError> {
        self.send(RelayCommand::Connect { conn_id, outbox }).await
    }

    /// Forwards a client event.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the relay task stopped.
    pub async fn dispatch(&self, conn_id: ConnectionId, event: ClientEvent) -> Result<(), RelayError> {
        self.send(RelayCommand::Event { conn_id, event }).await
    }

    /// Reports a closed connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the relay task stopped.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), RelayError> {
        self.send(RelayCommand::Disconnect { conn_id }).await
    }

    /// Fetches current counters from the relay task.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the relay task stopped
    /// before replying.
    pub async fn stats(&self) -> Result<RelayStats, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Stats { reply }).await?;
        rx.await.map_err(|_| RelayError::RelayUnavailable)
    }

    async fn send(&self, command: RelayCommand) -> Result<(), RelayError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| RelayError::RelayUnavailable)
    }
}

/// The relay task.
#[derive(Debug)]
pub struct Relay {
    state: RelayState,
    commands: mpsc::Receiver<RelayCommand>,
    typing_timeout: Option<Duration>,
}

impl Relay {
    /// Creates a relay and the handle that feeds it.
    ///
    /// `typing_timeout` enables force-clearing of stale typing indicators.
    #[must_use]
    pub fn new(command_capacity: usize, typing_timeout: Option<Duration>) -> (Self, RelayHandle) {
        let (sender, commands) = mpsc::channel(command_capacity.max(1));
        let relay = Self {
            state: RelayState::new(),
            commands,
            typing_timeout,
        };
        (relay, RelayHandle { sender })
    }

    /// Spawns the relay onto the current runtime and returns its handle.
    #[must_use]
    pub fn spawn(command_capacity: usize, typing_timeout: Option<Duration>) -> RelayHandle {
        let (relay, handle) = Self::new(command_capacity, typing_timeout);
        tokio::spawn(relay.run());
        handle
    }

    /// Runs the dispatch loop until every [`RelayHandle`] is dropped.
    pub async fn run(mut self) {
        let mut sweep = self.typing_timeout.map(|timeout| {
            let mut ticker = tokio::time::interval((timeout / 2).max(MIN_SWEEP_PERIOD));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        tracing::info!(typing_timeout = ?self.typing_timeout, "relay started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.apply(command);
                }
                () = next_tick(&mut sweep) => {
                    if let Some(timeout) = self.typing_timeout {
                        self.state.expire_typing(Instant::now(), timeout);
                    }
                }
            }
        }

        tracing::info!("relay stopped");
    }

    fn apply(&mut self, command: RelayCommand) {
        match command {
            RelayCommand::Connect { conn_id, outbox } => self.state.connect(conn_id, outbox),
            RelayCommand::Event { conn_id, event } => {
                self.state.dispatch(conn_id, event, Instant::now());
            }
            RelayCommand::Disconnect { conn_id } => self.state.disconnect(conn_id),
            RelayCommand::Stats { reply } => {
                let _ = reply.send(self.state.stats());
            }
        }
    }
}

/// Waits for the next sweep tick, or forever when expiry is disabled.
async fn next_tick(sweep: &mut Option<Interval>) {
    match sweep {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
