//! Settings type definitions.
//!
//! All types use camelCase JSON field names and `#[serde(default)]`, so a
//! settings file only needs the keys it overrides:
//!
//! ```json
//! { "server": { "port": 9000 }, "hub": { "mailboxCapacity": 64 } }
//! ```

use std::time::Duration;

use herald_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeraldSettings {
    /// HTTP / WebSocket listener settings.
    pub server: ServerSettings,
    /// Connection registry and per-connection task settings.
    pub hub: HubSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl HeraldSettings {
    /// Reject values the hub cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hub.mailbox_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.mailboxCapacity must be at least 1".into(),
            ));
        }
        if self.hub.idle_timeout_ms != 0
            && self.hub.ping_interval_ms != 0
            && self.hub.idle_timeout_ms <= self.hub.ping_interval_ms
        {
            return Err(SettingsError::InvalidValue(format!(
                "hub.idleTimeoutMs ({}) must exceed hub.pingIntervalMs ({})",
                self.hub.idle_timeout_ms, self.hub.ping_interval_ms
            )));
        }
        if self.server.user_header.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "server.userHeader must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP / WebSocket listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` auto-assigns).
    pub port: u16,
    /// Header carrying the authenticated user identity, set by the upstream proxy.
    pub user_header: String,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
    /// How long graceful shutdown waits for sessions to finish.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            user_header: "x-herald-user".to_string(),
            max_message_size: 64 * 1024,
            shutdown_timeout_ms: 10_000,
        }
    }
}

impl ServerSettings {
    /// Graceful shutdown budget.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Connection registry and per-connection task settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSettings {
    /// Capacity of each connection's outbound mailbox.
    pub mailbox_capacity: usize,
    /// Interval between server pings, in milliseconds (`0` disables).
    pub ping_interval_ms: u64,
    /// Disconnect after this long without inbound activity (`0` disables).
    pub idle_timeout_ms: u64,
    /// Send a `connection.established` frame right after admission.
    pub send_greeting: bool,
    /// How long a writer may spend on the final close frame, in milliseconds.
    pub close_timeout_ms: u64,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            mailbox_capacity: 256,
            ping_interval_ms: 30_000,
            idle_timeout_ms: 90_000,
            send_greeting: true,
            close_timeout_ms: 5_000,
        }
    }
}

impl HubSettings {
    /// Ping interval, or `None` when pings are disabled.
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_ms > 0).then(|| Duration::from_millis(self.ping_interval_ms))
    }

    /// Idle timeout, or `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_ms > 0).then(|| Duration::from_millis(self.idle_timeout_ms))
    }

    /// Bound on the writer's final close frame.
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive (overridden by `RUST_LOG`).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
