//! # macro-recorder: mouse and keyboard capture and replay
//!
//! Records a user's pointer and keyboard input as a timestamped event log and
//! replays it later with the same relative timing.
//!
//! ## Architecture
//!
//! - **Input**: the OS hook and injection APIs sit behind the
//!   [`InputObserver`](input::InputObserver) and
//!   [`InputInjector`](input::InputInjector) traits
//! - **Session**: [`EventLog`], the capturer, the replayer and the
//!   [`SessionController`] state machine
//! - **Protocol**: a line-oriented recorder/player pair driven over stdio
//! - **Communication**: crossbeam channels between the controller, the
//!   replay thread and front-ends
//!
//! ## Configuration
//!
//! Settings live in `config.toml` in the platform data directory under
//! `dev.macro-recorder`:
//!
//! - **Linux**: `~/.local/share/dev.macro-recorder/`
//! - **macOS**: `~/Library/Application Support/dev.macro-recorder/`
//! - **Windows**: `%APPDATA%\dev.macro-recorder\`
//!
//! ## Example
//!
//! ```
//! use macro_recorder::input::{RecordingInjector, VirtualObserver};
//! use macro_recorder::keys::Key;
//! use macro_recorder::{SessionController, StopOutcome};
//!
//! let observer = VirtualObserver::new();
//! let injector = RecordingInjector::new();
//! let mut session = SessionController::new(observer.clone(), injector.clone());
//!
//! session.start()?;
//! observer.emit_move(10.0, 20.0);
//! observer.emit_key(Key::Char('a'), true);
//! observer.emit_key(Key::Char('a'), false);
//! let StopOutcome::Recorded(log) = session.stop()? else { unreachable!() };
//! assert_eq!(log.count(), 3);
//!
//! session.play()?;
//! session.join_playback();
//! assert_eq!(injector.call_count(), 3);
//! # Ok::<(), macro_recorder::MacroError>(())
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod keys;
pub mod protocol;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{MacroError, Rejection, Result};
pub use keys::{Key, KeyRepr, NamedKey};
pub use session::{
    EventLog, PlaybackOptions, RecordingLibrary, Repeat, SessionController, SessionNotice,
    SessionState, StopOutcome,
};
pub use types::{Event, EventKind, MouseButton};
