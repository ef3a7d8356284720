//! # slidecast-settings
//!
//! Layered configuration: compiled defaults, then an optional JSON file
//! deep-merged on top, then `SLIDECAST_*` environment overrides.
//!
//! Settings are loaded once by the binary and passed down explicitly.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{
    LogFormat, LoggingSettings, ServerSettings, SlideSettings, SlidecastSettings, StoreBackend,
    StoreSettings,
};
