//! Line-oriented control protocol
//!
//! A headless recorder and player are driven over a text stream, one
//! command per line. Lines are trimmed before parsing; anything that is not
//! a known command is ignored.
//!
//! | Process  | Commands                    | Replies                                          |
//! |----------|-----------------------------|--------------------------------------------------|
//! | recorder | `START` `STOP` `QUIT`       | `RECORDING_STARTED`, `RECORDING_STOPPED` + JSON, `ERROR: ...` |
//! | player   | `PLAY:<json>` `STOP` `QUIT` | `PLAYBACK_STARTED`, `PLAYBACK_STOPPED`, `ERROR: Invalid JSON` |

pub mod player;
pub mod recorder;

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, ResultExt};

pub use player::run_player;
pub use recorder::run_recorder;

/// Reply sent when capture begins
pub const RECORDING_STARTED: &str = "RECORDING_STARTED";
/// Reply sent when capture ends; followed by one JSON line
pub const RECORDING_STOPPED: &str = "RECORDING_STOPPED";
/// Reply sent when replay begins
pub const PLAYBACK_STARTED: &str = "PLAYBACK_STARTED";
/// Reply sent when replay ends for any reason
pub const PLAYBACK_STOPPED: &str = "PLAYBACK_STOPPED";
/// Prefix of error replies
pub const ERROR_PREFIX: &str = "ERROR: ";

/// One parsed protocol line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    /// Replay the given exchange-format JSON
    Play(String),
    Quit,
}

impl Command {
    /// Parse a line; `None` for blank or unknown lines
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line {
            "START" => Some(Command::Start),
            "STOP" => Some(Command::Stop),
            "QUIT" => Some(Command::Quit),
            _ => line
                .strip_prefix("PLAY:")
                .map(|payload| Command::Play(payload.trim().to_string())),
        }
    }
}

/// Line writer shared between a protocol loop and its notice thread
#[derive(Debug)]
pub struct SharedWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for SharedWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> SharedWriter<W> {
    /// Wrap an output stream
    pub fn new(output: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(output)),
        }
    }

    /// Write one line and flush
    pub fn line(&self, text: &str) -> Result<()> {
        let mut out = self.inner.lock();
        writeln!(out, "{}", text)
            .and_then(|()| out.flush())
            .context("Failed to write protocol reply")
    }

    /// Write an `ERROR: ` reply
    pub fn error(&self, message: &str) -> Result<()> {
        self.line(&format!("{}{}", ERROR_PREFIX, message))
    }
}
