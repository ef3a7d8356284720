//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use slidecast_settings::ServerSettings;

/// Runtime configuration for [`SlidecastServer`](crate::SlidecastServer).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Seconds between keepalive pings; `0` disables them.
    pub ping_interval_secs: u64,
    /// Outbound frames buffered per connection before drops start.
    pub send_queue_capacity: usize,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_bytes: usize,
    /// Max upload body size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            ping_interval_secs: 30,
            send_queue_capacity: 256,
            max_message_bytes: 1024 * 1024,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Build from the `server` section of the settings file.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            ping_interval_secs: settings.ping_interval_secs,
            send_queue_capacity: settings.send_queue_capacity.max(1),
            max_message_bytes: settings.max_message_bytes,
            max_upload_bytes: settings.max_upload_bytes,
        }
    }

    /// Keepalive period, if enabled.
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
