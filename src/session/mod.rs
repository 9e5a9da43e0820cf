//! Capture and replay engine
//!
//! This module holds the core of the macro recorder: the event log, the
//! capturer that fills it from the input hook, the replayer that re-injects
//! it with the original timing, and the controller tying them together.
//!
//! # Features
//!
//! - Capture pointer and keyboard input with relative timestamps
//! - Replay at original or scaled speed, once, N times or forever
//! - Cancel a replay mid-way; the stop wakes any pending sleep
//! - Save and load logs in the JSON exchange format
//! - Keep a library of named recordings

pub mod controller;
pub mod exchange;
pub mod library;
pub mod player;
pub mod recorder;
pub mod types;

pub use controller::{SessionController, StopOutcome};
pub use exchange::{ActionRecord, ExchangeDocument};
pub use library::{RecordingLibrary, RecordingSummary};
pub use player::{stop_channel, PlaybackOptions, Repeat, Replayer, StopHandle, StopSignal};
pub use recorder::Capturer;
pub use types::{EventLog, ReplayReport, SessionNotice, SessionState};
