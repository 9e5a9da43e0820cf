//! Named recordings stored on disk
//!
//! Each recording is one exchange-format file, `<name>.json`, inside the
//! library directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{MacroError, Result, ResultExt};

use super::exchange;
use super::types::EventLog;

/// File extension used for stored recordings
pub const RECORDING_EXTENSION: &str = "json";

/// Listing entry for a stored recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    /// Recording name (file stem)
    pub name: String,
    /// Full path to the file
    pub path: PathBuf,
    /// Last modification time
    pub modified: DateTime<Local>,
    /// Number of events
    pub events: usize,
    /// Timestamp of the last event in seconds
    pub duration: f64,
}

/// A directory of named recordings
#[derive(Debug, Clone)]
pub struct RecordingLibrary {
    dir: PathBuf,
}

impl RecordingLibrary {
    /// Open a library rooted at `dir`; the directory is created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Library directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a recording with this name is stored at
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.{}", name, RECORDING_EXTENSION)))
    }

    /// Whether a recording with this name exists
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Store a log under `name`, replacing any existing recording
    pub fn save(&self, name: &str, log: &EventLog) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        exchange::save_to_file(log, &path)?;
        tracing::info!(name, events = log.count(), "recording saved");
        Ok(path)
    }

    /// Read the recording stored under `name`
    pub fn load(&self, name: &str) -> Result<EventLog> {
        let path = self.existing(name)?;
        exchange::load_from_file(&path)
    }

    /// List recordings, newest first
    ///
    /// Files that cannot be read or parsed are skipped with a warning.
    pub fn list(&self) -> Result<Vec<RecordingSummary>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read {}", self.dir.display()))?;

        let mut recordings = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORDING_EXTENSION) {
                continue;
            }
            match summarize(&path) {
                Ok(summary) => recordings.push(summary),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        recordings.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(recordings)
    }

    /// Remove the recording stored under `name`
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.existing(name)?;
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to delete {}", path.display()))?;
        tracing::info!(name, "recording deleted");
        Ok(())
    }

    /// Rename a recording; fails if `new_name` is already taken
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<PathBuf> {
        let from = self.existing(old_name)?;
        let to = self.path_for(new_name)?;
        if to.exists() {
            return Err(MacroError::Library(format!(
                "a recording named '{}' already exists",
                new_name
            )));
        }
        std::fs::rename(&from, &to)
            .with_context(|| format!("Failed to rename {}", from.display()))?;
        tracing::info!(from = old_name, to = new_name, "recording renamed");
        Ok(to)
    }

    fn existing(&self, name: &str) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(MacroError::Library(format!("no recording named '{}'", name)));
        }
        Ok(path)
    }
}

/// Check that a name can be used as a file stem inside the library
pub fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(MacroError::Library("recording name is empty".to_string()));
    }
    if trimmed != name {
        return Err(MacroError::Library(
            "recording name has leading or trailing whitespace".to_string(),
        ));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(MacroError::Library(format!(
            "invalid recording name '{}'",
            name
        )));
    }
    Ok(())
}

fn summarize(path: &Path) -> Result<RecordingSummary> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MacroError::Library("file name is not valid UTF-8".to_string()))?
        .to_string();
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .context("Failed to read file metadata")?;
    let log = exchange::load_from_file(path)?;

    Ok(RecordingSummary {
        name,
        path: path.to_path_buf(),
        modified: DateTime::<Local>::from(modified),
        events: log.count(),
        duration: log.duration(),
    })
}
