//! Error handling for the macro recorder
//!
//! This module defines the crate error type, a Result alias, and a small
//! extension trait for attaching context to failures.

use thiserror::Error;

/// Reason a controller command was refused
///
/// Rejections never change session state; callers may surface them as a
/// status message or ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `start()` while a capture is already running
    AlreadyRecording,
    /// Command not allowed while a capture is running
    RecordingActive,
    /// Command not allowed while playback is running
    PlaybackActive,
    /// `play()` with nothing to replay
    EmptyLog,
    /// The controller has been shut down
    ShutDown,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Rejection::AlreadyRecording => "already recording",
            Rejection::RecordingActive => "a recording is in progress",
            Rejection::PlaybackActive => "playback is in progress",
            Rejection::EmptyLog => "the event log is empty",
            Rejection::ShutDown => "the session has been shut down",
        };
        f.write_str(msg)
    }
}

/// Main error type for macro recorder operations
#[derive(Error, Debug)]
pub enum MacroError {
    /// The OS input hook could not be installed
    #[error("Hook registration failed: {0}")]
    HookRegistration(String),

    /// An injection call into the OS failed
    #[error("Injection error: {0}")]
    Injection(String),

    /// A stored key could not be mapped back to an injectable key
    #[error("Unknown key: {0:?}")]
    KeyResolution(String),

    /// A controller command was refused in the current state
    #[error("Command rejected: {0}")]
    Rejected(Rejection),

    /// Malformed exchange-format payload
    #[error("Invalid recording data: {0}")]
    Codec(#[from] serde_json::Error),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to the recording library
    #[error("Library error: {0}")]
    Library(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MacroError>,
    },
}

impl MacroError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MacroError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error is a refused state transition
    pub fn is_rejection(&self) -> bool {
        match self {
            MacroError::Rejected(_) => true,
            MacroError::WithContext { source, .. } => source.is_rejection(),
            _ => false,
        }
    }

    /// The rejection reason, if this is a refused state transition
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            MacroError::Rejected(reason) => Some(*reason),
            MacroError::WithContext { source, .. } => source.rejection(),
            _ => None,
        }
    }
}

impl From<Rejection> for MacroError {
    fn from(reason: Rejection) -> Self {
        MacroError::Rejected(reason)
    }
}

/// Result type alias for macro recorder operations
pub type Result<T> = std::result::Result<T, MacroError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| MacroError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| MacroError::Io(e).with_context(f()))
    }
}
