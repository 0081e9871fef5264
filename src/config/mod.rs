//! Configuration for the module framework
//!
//! This module handles persistent configuration:
//! - Logging filter and optional log file output
//! - Execution settings (input validation, output display policy)
//! - Location of the stored command options
//!
//! # App Data Location
//!
//! Data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.modframe.modframe-rs/`
//! - **macOS**: `~/Library/Application Support/dev.modframe.modframe-rs/`
//! - **Windows**: `%APPDATA%\dev.modframe.modframe-rs\`
//!
//! Setting `MODFRAME_DATA_DIR` overrides the location.
//!
//! # Files
//!
//! - `config.toml` - [`FrameworkConfig`]
//! - `options.json` - values recorded by [`crate::options::OptionsService`]
//!
//! # Example
//!
//! ```ignore
//! use modframe_rs::config::FrameworkConfig;
//!
//! let mut config = FrameworkConfig::load_or_default();
//! config.execution.validate_inputs = false;
//! config.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{FrameworkError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.modframe.modframe-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Stored options filename
pub const OPTIONS_FILE: &str = "options.json";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "MODFRAME_DATA_DIR";

const CONFIG_VERSION: u32 = 1;

/// Get the application data directory
pub fn app_data_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the application data directory, creating it if needed
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        FrameworkError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            FrameworkError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

pub fn options_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(OPTIONS_FILE))
}

/// Persistent framework configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// Config format version
    #[serde(default = "default_config_version")]
    pub version: u32,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub execution: ExecutionSettings,
}

fn default_config_version() -> u32 {
    CONFIG_VERSION
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            logging: LoggingSettings::default(),
            execution: ExecutionSettings::default(),
        }
    }
}

impl FrameworkConfig {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            FrameworkError::Config("Could not determine config path".to_string())
        })?;
        Self::load_from(path)
    }

    /// Load config from `path`; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| FrameworkError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| FrameworkError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(CONFIG_FILE))
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FrameworkError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| FrameworkError::Config(format!("Failed to write config: {}", e)))
    }
}
