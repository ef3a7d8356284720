//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SlidecastSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{LogFormat, SlidecastSettings, StoreBackend};

/// `~/.slidecast`, or `/tmp/.slidecast` when `HOME` is unset.
pub fn slidecast_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".slidecast")
}

/// Resolve the path to the settings file (`~/.slidecast/settings.json`).
pub fn settings_path() -> PathBuf {
    slidecast_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SlidecastSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. A file with invalid JSON, or values that
/// fail [`SlidecastSettings::validate`], is an error.
pub fn load_settings_from_path(path: &Path) -> Result<SlidecastSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<SlidecastSettings> {
    let defaults = serde_json::to_value(SlidecastSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides.
pub fn apply_env_overrides(settings: &mut SlidecastSettings) {
    apply_overrides_from(settings, &|name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning and the file/default value
/// stays in effect.
pub fn apply_overrides_from(settings: &mut SlidecastSettings, lookup: &dyn Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("SLIDECAST_HOST") {
        settings.server.host = v;
    }
    // PORT is what most hosting platforms inject
    if let Some(v) = env
        .u16("SLIDECAST_PORT", 0, 65535)
        .or_else(|| env.u16("PORT", 0, 65535))
    {
        settings.server.port = v;
    }
    if let Some(v) = env.u64("SLIDECAST_PING_INTERVAL", 0, 3600) {
        settings.server.ping_interval_secs = v;
    }

    // ── Store ───────────────────────────────────────────────────────
    if let Some(v) = env.string("SLIDECAST_DB_PATH") {
        settings.store.path = Some(v);
    }
    if let Some(v) = env.string("SLIDECAST_STORE_BACKEND") {
        match parse_backend(&v) {
            Some(backend) => settings.store.backend = backend,
            None => tracing::warn!(key = "SLIDECAST_STORE_BACKEND", value = %v, "invalid store backend, ignoring"),
        }
    }

    // ── Slides ──────────────────────────────────────────────────────
    if let Some(v) = env.string("SLIDECAST_SLIDES_DIR") {
        settings.slides.slides_dir = v;
    }
    if let Some(v) = env.string("SLIDECAST_UPLOADS_DIR") {
        settings.slides.uploads_dir = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("SLIDECAST_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("SLIDECAST_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => tracing::warn!(key = "SLIDECAST_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a store backend name (case-insensitive).
pub fn parse_backend(val: &str) -> Option<StoreBackend> {
    match val.to_lowercase().as_str() {
        "sqlite" => Some(StoreBackend::Sqlite),
        "memory" => Some(StoreBackend::Memory),
        _ => None,
    }
}

/// Parse a log format name (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_lowercase().as_str() {
        "compact" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

struct EnvReader<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvReader<'_> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = self.string(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
