//! Settings persistence
//!
//! Resolves the platform config location and keeps a [`Config`] paired with
//! the file it came from.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ConfigError, SettingsError, SettingsResult};

const APP_DIR: &str = "pathplay";
const CONFIG_FILE: &str = "config.toml";

/// Platform config directory for PathPlay
pub fn config_dir() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| {
            ConfigError::UnsupportedPlatform("no configuration directory".to_string()).into()
        })
}

/// Default config file path
pub fn default_config_path() -> SettingsResult<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// A config together with the file it is persisted to
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    config: Config,
}

impl SettingsStore {
    /// Open the store at `path`; a missing file yields defaults
    pub fn open(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let config = Config::load_or_default(&path)?;
        Ok(Self { path, config })
    }

    /// Open the store at the platform default location
    pub fn open_default() -> SettingsResult<Self> {
        Self::open(default_config_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Write the config back, creating the parent directory if needed
    pub fn save(&self) -> SettingsResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }
        self.config.save_to_file(&self.path)?;
        info!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Reload from disk, discarding unsaved changes
    pub fn reload(&mut self) -> SettingsResult<()> {
        self.config = Config::load_or_default(&self.path)?;
        debug!("Reloaded settings from {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_ends_with_app_file() {
        if let Ok(path) = default_config_path() {
            assert!(path.ends_with("pathplay/config.toml"));
        }
    }
}
