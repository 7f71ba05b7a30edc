//! PathPlay Settings Crate
//!
//! Handles application configuration and its persistence.

pub mod config;
pub mod error;
pub mod persistence;

pub use config::{Config, InterpreterSettings, PlaybackSettings, StockSettings};
pub use error::{ConfigError, SettingsError, SettingsResult};
pub use persistence::{config_dir, default_config_path, SettingsStore};
