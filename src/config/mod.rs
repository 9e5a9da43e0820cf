//! Configuration for the macro recorder
//!
//! Settings are read from a TOML file. Every section and field is optional;
//! anything missing takes its default.
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.macro-recorder/`
//! - **macOS**: `~/Library/Application Support/dev.macro-recorder/`
//! - **Windows**: `%APPDATA%\dev.macro-recorder\`
//!
//! # Files
//!
//! - `config.toml` - Playback, library and logging settings
//! - `recordings/` - Default library of named recordings
//!
//! # Example
//!
//! ```toml
//! [playback]
//! speed = 2.0
//! repeat_count = 3
//!
//! [logging]
//! filter = "debug"
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{MacroError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.macro-recorder";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default library directory name inside the app data directory
pub const RECORDINGS_DIR: &str = "recordings";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Replay defaults
    pub playback: PlaybackSettings,

    /// Recording library location
    pub library: LibrarySettings,

    /// Log output
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Load config from the default location
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            MacroError::Config("Could not determine config file path".to_string())
        })?;
        Self::load_from(&path)
    }

    /// Load config from a specific file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            MacroError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            MacroError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Save config to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MacroError::Config(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MacroError::Serialization(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| {
            MacroError::Config(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    /// Write a default config file at `path`
    ///
    /// An existing file is left alone unless `overwrite` is set.
    pub fn init_at(path: &Path, overwrite: bool) -> Result<Self> {
        if path.exists() && !overwrite {
            return Err(MacroError::Config(format!(
                "{} already exists",
                path.display()
            )));
        }
        let config = Self::default();
        config.save_to(path)?;
        tracing::info!(path = %path.display(), "wrote default config");
        Ok(config)
    }

    /// Directory of the recording library
    ///
    /// Uses the configured override, else `recordings/` in the app data
    /// directory, else `recordings/` under the working directory.
    pub fn library_dir(&self) -> PathBuf {
        if let Some(dir) = &self.library.directory {
            return dir.clone();
        }
        app_data_dir()
            .map(|d| d.join(RECORDINGS_DIR))
            .unwrap_or_else(|| PathBuf::from(RECORDINGS_DIR))
    }
}
