//! Individual configuration sections
//!
//! # Main Types
//!
//! - [`PlaybackSettings`] - Default speed and repetition for replay
//! - [`LibrarySettings`] - Where named recordings are kept
//! - [`LoggingSettings`] - Optional log file and filter override

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::session::player::{PlaybackOptions, Repeat, DEFAULT_REPEAT_GAP};

/// `[playback]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Speed multiplier (clamped to 0.1-10.0 when applied)
    pub speed: f64,

    /// Number of passes when not looping
    pub repeat_count: u32,

    /// Repeat until stopped
    pub infinite_loop: bool,

    /// Pause between passes in milliseconds
    pub repeat_gap_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            repeat_count: 1,
            infinite_loop: false,
            repeat_gap_ms: DEFAULT_REPEAT_GAP.as_millis() as u64,
        }
    }
}

impl PlaybackSettings {
    /// Convert to replay options
    pub fn to_options(&self) -> PlaybackOptions {
        let repeat = if self.infinite_loop {
            Repeat::Forever
        } else {
            Repeat::Times(self.repeat_count.max(1))
        };
        PlaybackOptions::default()
            .with_speed(self.speed)
            .with_repeat(repeat)
            .with_repeat_gap(Duration::from_millis(self.repeat_gap_ms))
    }
}

/// `[library]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Override for the recordings directory
    pub directory: Option<PathBuf>,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Also write logs to a daily-rolling file with this path prefix
    pub file: Option<PathBuf>,

    /// Filter directive used when `RUST_LOG` is not set
    pub filter: Option<String>,
}
