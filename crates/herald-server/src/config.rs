//! Server configuration.

use std::time::Duration;

use herald_hub::HubConfig;
use herald_settings::{HeraldSettings, HubSettings};

/// Configuration for the Herald server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Header carrying the authenticated user id.
    pub user_header: String,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// How long shutdown waits for sessions to close.
    pub shutdown_timeout: Duration,
    /// Per-connection hub settings.
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            user_header: "x-herald-user".into(),
            max_message_size: 64 * 1024,
            shutdown_timeout: Duration::from_secs(10),
            hub: HubConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &HeraldSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            user_header: settings.server.user_header.to_ascii_lowercase(),
            max_message_size: settings.server.max_message_size,
            shutdown_timeout: settings.server.shutdown_timeout(),
            hub: hub_config(&settings.hub),
        }
    }

    /// `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Translate hub settings into the hub's runtime config.
pub fn hub_config(settings: &HubSettings) -> HubConfig {
    HubConfig {
        mailbox_capacity: settings.mailbox_capacity,
        ping_interval: settings.ping_interval(),
        idle_timeout: settings.idle_timeout(),
        send_greeting: settings.send_greeting,
        close_timeout: settings.close_timeout(),
    }
}
