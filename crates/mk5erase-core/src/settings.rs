//! Persistent user settings for mk5erase
//!
//! Settings are stored in a TOML configuration file at:
//! - Linux: `~/.config/mk5erase/mk5erase_config.toml`
//! - macOS: `~/Library/Application Support/mk5erase/mk5erase_config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! [device]
//! address = "mark5fx.example.org"
//! port = 2620
//!
//! [erase]
//! condition = true
//! progress = true
//! progress_interval_secs = 60
//!
//! [display]
//! gigabyte = true
//! ```
//!
//! Command line flags always take precedence over these values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::erase::{EraseConfig, DEFAULT_SAMPLE_INTERVAL};
use crate::link::DEFAULT_PORT;

/// Configuration file name
const CONFIG_FILE_NAME: &str = "mk5erase_config.toml";

/// Application name for config directory
const APP_NAME: &str = "mk5erase";

/// Recorder host used when nothing else is configured
const DEFAULT_ADDRESS: &str = "localhost";

/// User settings loaded from configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Which recorder to talk to
    pub device: DeviceSettings,

    /// Erase defaults
    pub erase: EraseSettings,

    /// Output formatting
    pub display: DisplaySettings,
}

/// Recorder connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceSettings {
    /// Host name or IP address of the recorder
    pub address: String,

    /// Control port
    pub port: u16,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Defaults for the erase command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EraseSettings {
    /// Condition packs while erasing
    pub condition: bool,

    /// Report conditioning progress
    pub progress: bool,

    /// Seconds between progress reports
    pub progress_interval_secs: u64,
}

impl Default for EraseSettings {
    fn default() -> Self {
        Self {
            condition: false,
            progress: false,
            progress_interval_secs: DEFAULT_SAMPLE_INTERVAL.as_secs(),
        }
    }
}

impl EraseSettings {
    /// Erase configuration these settings describe
    pub fn erase_config(&self) -> EraseConfig {
        EraseConfig::new()
            .condition(self.condition)
            .sample_progress(self.progress)
            .sample_interval(Duration::from_secs(self.progress_interval_secs))
    }
}

/// Output formatting settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplaySettings {
    /// Show byte counts in GB (10^9 bytes) instead of bytes
    pub gigabyte: bool,
}

impl Settings {
    /// Load settings from `path`
    ///
    /// Returns default settings if the file doesn't exist or can't be parsed
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            tracing::debug!("No config path available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => {
                    tracing::debug!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save settings to a specific path
    pub fn save_to_path(&self, path: Option<PathBuf>) -> Result<PathBuf, SettingsError> {
        let path = path.ok_or(SettingsError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let contents = toml::to_string_pretty(self).map_err(SettingsError::Serialize)?;

        std::fs::write(&path, contents).map_err(|e| SettingsError::Io {
            path: path.clone(),
            source: e,
        })?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(path)
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join(CONFIG_FILE_NAME))
    }

    /// Get the path to the configuration directory
    pub fn config_dir() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_NAME))
    }
}

/// Errors that can occur when working with settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No configuration directory available
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// Failed to read or write config file
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path that caused the error
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// Failed to serialize settings
    #[error("Failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),
}
