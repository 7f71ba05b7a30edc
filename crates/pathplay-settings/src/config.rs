//! Configuration for PathPlay
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats, chosen by file extension.
//!
//! Configuration is organized into sections:
//! - Interpreter (arc subdivision, REPEAT nesting limit)
//! - Playback (timer interval, default speed, material removal cadence)
//! - Stock (voxel stock block and ball tool)

use pathplay_core::constants::{
    ARC_STEP_DEGREES, DEFAULT_MAX_REPEAT_DEPTH, DEFAULT_PLAYBACK_SPEED, DEFAULT_TICK_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// Interpreter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterSettings {
    /// Largest angular step of one arc sub-segment, degrees
    pub arc_step_degrees: f64,
    /// Maximum simultaneously pending REPEAT blocks
    pub max_repeat_depth: usize,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            arc_step_degrees: ARC_STEP_DEGREES,
            max_repeat_depth: DEFAULT_MAX_REPEAT_DEPTH,
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Timer interval in milliseconds
    pub tick_interval_ms: u64,
    /// Default playback speed in mm/s
    pub default_speed: f64,
    /// Material removal every Nth marker update (0 = disabled)
    pub removal_interval: u32,
}

impl PlaybackSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            default_speed: DEFAULT_PLAYBACK_SPEED,
            removal_interval: 0,
        }
    }
}

/// Stock block and tool for material removal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockSettings {
    /// X extent in mm
    pub width: f64,
    /// Y extent in mm
    pub height: f64,
    /// Z extent in mm
    pub depth: f64,
    /// Minimum corner of the block
    pub origin: [f64; 3],
    /// Voxel edge length in mm
    pub resolution: f64,
    /// Ball tool radius in mm
    pub tool_radius: f64,
}

impl Default for StockSettings {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
            depth: 20.0,
            origin: [0.0, 0.0, -20.0],
            resolution: 0.5,
            tool_radius: 1.5,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub interpreter: InterpreterSettings,
    pub playback: PlaybackSettings,
    pub stock: StockSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("<none>").to_string()).into()),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load config from file, or defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("{}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let step = self.interpreter.arc_step_degrees;
        if !(step > 0.0 && step <= 90.0) {
            return Err(SettingsError::invalid(
                "interpreter.arc_step_degrees",
                format!("must be in (0, 90], got {}", step),
            ));
        }
        if self.interpreter.max_repeat_depth == 0 {
            return Err(SettingsError::invalid(
                "interpreter.max_repeat_depth",
                "must be > 0",
            ));
        }

        if self.playback.tick_interval_ms == 0 {
            return Err(SettingsError::invalid(
                "playback.tick_interval_ms",
                "must be > 0",
            ));
        }
        if !self.playback.default_speed.is_finite() || self.playback.default_speed <= 0.0 {
            return Err(SettingsError::invalid(
                "playback.default_speed",
                "must be > 0",
            ));
        }

        let stock = &self.stock;
        for (key, value) in [
            ("stock.width", stock.width),
            ("stock.height", stock.height),
            ("stock.depth", stock.depth),
            ("stock.resolution", stock.resolution),
            ("stock.tool_radius", stock.tool_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SettingsError::invalid(key, "must be > 0"));
            }
        }
        if stock.origin.iter().any(|v| !v.is_finite()) {
            return Err(SettingsError::invalid("stock.origin", "must be finite"));
        }

        Ok(())
    }

    /// Merge another config into this one; sections left at their defaults in `other` are kept
    pub fn merge(&mut self, other: &Config) {
        if other.interpreter != InterpreterSettings::default() {
            self.interpreter = other.interpreter.clone();
        }
        if other.playback != PlaybackSettings::default() {
            self.playback = other.playback.clone();
        }
        if other.stock != StockSettings::default() {
            self.stock = other.stock.clone();
        }
    }
}
