//! Settings types. Every struct deserializes with defaults for missing keys,
//! so a settings file only needs the values it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlidecastSettings {
    /// HTTP and WebSocket server.
    pub server: ServerSettings,
    /// Session store.
    pub store: StoreSettings,
    /// Slide library and rasterizer.
    pub slides: SlideSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl SlidecastSettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.send_queue_capacity == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "server.sendQueueCapacity must be at least 1".into(),
            ));
        }
        if self.store.pool_size == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "store.poolSize must be at least 1".into(),
            ));
        }
        if self.slides.rasterizer_command.trim().is_empty() {
            return Err(crate::SettingsError::InvalidValue(
                "slides.rasterizerCommand is empty".into(),
            ));
        }
        Ok(())
    }
}

/// Server network and transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (0 picks a free port).
    pub port: u16,
    /// Seconds between keepalive pings. 0 disables pings.
    pub ping_interval_secs: u64,
    /// Outbound frames buffered per connection before new frames are dropped.
    pub send_queue_capacity: usize,
    /// Largest accepted inbound WebSocket frame.
    pub max_message_bytes: usize,
    /// Largest accepted upload body.
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            ping_interval_secs: 30,
            send_queue_capacity: 256,
            max_message_bytes: 1024 * 1024,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Which session store implementation to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// File-backed `SQLite`.
    #[default]
    Sqlite,
    /// Process memory; lost on restart.
    Memory,
}

/// Session store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Backend.
    pub backend: StoreBackend,
    /// Database file. Defaults to `~/.slidecast/sessions.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Connection pool size.
    pub pool_size: u32,
    /// `SQLite` busy timeout.
    pub busy_timeout_ms: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: None,
            pool_size: 8,
            busy_timeout_ms: 5000,
        }
    }
}

impl StoreSettings {
    /// Resolved database path.
    pub fn db_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map_or_else(|| crate::loader::slidecast_home().join("sessions.db"), PathBuf::from)
    }
}

/// Slide library and rasterizer settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlideSettings {
    /// Root of the per-session slide image directories.
    pub slides_dir: String,
    /// Staging directory for uploaded documents.
    pub uploads_dir: String,
    /// Rasterizer executable.
    pub rasterizer_command: String,
    /// Output resolution.
    pub dpi: u32,
}

impl Default for SlideSettings {
    fn default() -> Self {
        Self {
            slides_dir: "public/slides".to_string(),
            uploads_dir: "uploads".to_string(),
            rasterizer_command: "pdftoppm".to_string(),
            dpi: 110,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
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
