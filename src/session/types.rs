//! Session data types

use chrono::NaiveDateTime;

use crate::types::Event;

/// State of the capture/replay session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing running
    #[default]
    Idle,
    /// Capturing input into a fresh log
    Recording,
    /// Replaying the current log
    Playing,
}

impl SessionState {
    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording)
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        matches!(self, SessionState::Playing)
    }

    /// Check if idle
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Recording => "Recording",
            SessionState::Playing => "Playing",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Ordered record of one capture session
///
/// Events are kept in append order, which is also timestamp order. Once a
/// capture stops the log is shared behind an `Arc` and never mutated again.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog {
    /// Wall-clock time the session started (informational)
    session_start: NaiveDateTime,
    /// Recorded events, oldest first
    events: Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(chrono::Local::now().naive_local())
    }
}

impl EventLog {
    /// Create an empty log
    pub fn new(session_start: NaiveDateTime) -> Self {
        Self {
            session_start,
            events: Vec::new(),
        }
    }

    /// Build a log from already-ordered events
    ///
    /// Events whose timestamp is earlier than their predecessor's are
    /// clamped forward so the log stays non-decreasing.
    pub fn from_events(session_start: NaiveDateTime, events: Vec<Event>) -> Self {
        let mut log = Self::new(session_start);
        for event in events {
            log.append(event);
        }
        log
    }

    /// Append an event, keeping timestamps non-decreasing
    pub(crate) fn append(&mut self, mut event: Event) {
        if let Some(last) = self.events.last() {
            if event.time < last.time {
                event.time = last.time;
            }
        }
        self.events.push(event);
    }

    /// Wall-clock time the session started
    pub fn session_start(&self) -> NaiveDateTime {
        self.session_start
    }

    /// Iterate events in timestamp order
    ///
    /// Each call starts again from the first event.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// All events as a slice
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events
    pub fn count(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamp of the last event in seconds
    pub fn duration(&self) -> f64 {
        self.events.last().map(|e| e.time).unwrap_or(0.0)
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Summary of a finished replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayReport {
    /// Events successfully injected
    pub dispatched: usize,
    /// Events skipped because their key did not resolve or injection failed
    pub skipped: usize,
    /// Passes over the log that were started
    pub iterations: u32,
    /// Whether a stop request ended the replay early
    pub cancelled: bool,
}

/// Notification emitted by a session controller
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    /// Capture began
    RecordingStarted,
    /// Capture ended with this many events
    RecordingStopped { events: usize },
    /// Replay began
    PlaybackStarted { events: usize },
    /// One more event of the current pass was handled, dispatched or skipped
    PlaybackProgress { processed: usize, total: usize },
    /// Replay ended, naturally or by request
    PlaybackFinished(ReplayReport),
}
