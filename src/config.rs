//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Plain,
    /// One JSON object per line.
    Json,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Capacity of the command channel feeding the relay task.
    pub command_capacity: usize,

    /// Capacity of each connection's outbound queue. Events for a full
    /// queue are dropped.
    pub outbox_capacity: usize,

    /// Typing indicators older than this are force-cleared. `None`
    /// disables expiry.
    pub typing_timeout: Option<Duration>,

    /// Interval between server-initiated WebSocket pings.
    pub ping_interval: Duration,

    /// A connection with no inbound frame for this long is closed.
    pub idle_timeout: Duration,

    /// Largest accepted inbound WebSocket message in bytes.
    pub max_message_bytes: usize,

    /// Allowed CORS origin. `None` means permissive.
    pub cors_origin: Option<String>,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            command_capacity: 10_000,
            outbox_capacity: 256,
            typing_timeout: Some(Duration::from_secs(10)),
            ping_interval: Duration::from_secs(25),
            idle_timeout: Duration::from_secs(60),
            max_message_bytes: 64 * 1024,
            cors_origin: None,
            log_format: LogFormat::Plain,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to [`RelayConfig::default`] values when a variable is not
    /// set. Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, std::net::AddrParseError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = resolve_listen_addr(
            std::env::var("LISTEN_ADDR").ok(),
            std::env::var("PORT").ok(),
            defaults.listen_addr,
        )?;

        let typing_timeout_secs: u64 = parse_env("TYPING_TIMEOUT_SECS", 10);
        let typing_timeout =
            (typing_timeout_secs > 0).then(|| Duration::from_secs(typing_timeout_secs));

        let log_format = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Plain,
        };

        Ok(Self {
            listen_addr,
            command_capacity: parse_env("RELAY_COMMAND_CAPACITY", defaults.command_capacity),
            outbox_capacity: parse_env("OUTBOX_CAPACITY", defaults.outbox_capacity),
            typing_timeout,
            ping_interval: Duration::from_secs(parse_env("WS_PING_INTERVAL_SECS", 25)),
            idle_timeout: Duration::from_secs(parse_env("WS_IDLE_TIMEOUT_SECS", 60)),
            max_message_bytes: parse_env("WS_MAX_MESSAGE_BYTES", defaults.max_message_bytes),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|s| !s.is_empty()),
            log_format,
        })
    }
}

/// Picks the bind address: `LISTEN_ADDR` wins, otherwise `PORT` on all
/// interfaces, otherwise `default`. An unparsable `PORT` is ignored.
fn resolve_listen_addr(
    listen_addr: Option<String>,
    port: Option<String>,
    default: SocketAddr,
) -> Result<SocketAddr, std::net::AddrParseError> {
    if let Some(raw) = listen_addr {
        return raw.parse();
    }
    let port = port.and_then(|p| p.parse::<u16>().ok());
    Ok(port.map_or(default, |port| SocketAddr::new(default.ip(), port)))
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
