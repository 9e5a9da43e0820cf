//! OS input boundary: hook observation and event injection
//!
//! The operating system's input hook is an external capability. This module
//! abstracts it behind two traits so the capture and replay engine never
//! talks to a platform API directly:
//!
//! - [`InputObserver`] - registers a [`InputSink`] that receives raw pointer
//!   and keyboard notifications on the observer's own delivery thread(s)
//! - [`InputInjector`] - regenerates pointer and keyboard input
//!
//! # Implementations
//!
//! - [`VirtualObserver`] / [`RecordingInjector`] - in-process devices for
//!   tests and scripted sessions
//! - [`UnavailableObserver`] / [`LoggingInjector`] - fallbacks used when the
//!   crate is built without a platform backend
//! - `NativeObserver` / `NativeInjector` - rdev-backed implementations
//!   (only with the `native-input` feature)

pub mod clock;
pub mod fallback;
#[cfg(feature = "native-input")]
pub mod native;
pub mod virtual_device;

use std::sync::Arc;

use crate::error::Result;
use crate::keys::Key;
use crate::types::MouseButton;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fallback::{LoggingInjector, UnavailableObserver};
#[cfg(feature = "native-input")]
pub use native::{NativeInjector, NativeObserver};
pub use virtual_device::{InjectedCall, RecordingInjector, VirtualObserver};

/// Receiver of raw input notifications
///
/// Called concurrently from the observer's delivery threads; implementations
/// must do their own synchronization.
pub trait InputSink: Send + Sync {
    /// Pointer moved to an absolute position
    fn on_move(&self, x: f64, y: f64);

    /// Mouse button pressed or released
    fn on_button(&self, x: f64, y: f64, button: MouseButton, pressed: bool);

    /// Wheel scrolled
    fn on_scroll(&self, x: f64, y: f64, dx: i64, dy: i64);

    /// Key pressed or released
    fn on_key(&self, key: Key, pressed: bool);
}

/// Source of raw input notifications (the OS hook)
pub trait InputObserver: Send {
    /// Install the hook and start delivering notifications to `sink`
    ///
    /// Failure must leave no hook installed.
    fn register(&mut self, sink: Arc<dyn InputSink>) -> Result<()>;

    /// Remove the hook
    ///
    /// After this returns, the previously registered sink receives no
    /// further calls. Calling it with nothing registered is a no-op.
    fn unregister(&mut self);

    /// Whether a sink is currently registered
    fn is_registered(&self) -> bool;
}

/// Synthetic input generator (the OS injection API)
#[cfg_attr(test, mockall::automock)]
pub trait InputInjector: Send {
    /// Set the absolute pointer position
    fn move_pointer(&mut self, x: i32, y: i32) -> Result<()>;

    /// Press a mouse button at the current pointer position
    fn press_button(&mut self, button: MouseButton) -> Result<()>;

    /// Release a mouse button at the current pointer position
    fn release_button(&mut self, button: MouseButton) -> Result<()>;

    /// Scroll by a number of wheel steps
    fn scroll(&mut self, dx: i32, dy: i32) -> Result<()>;

    /// Press a key
    fn press_key(&mut self, key: Key) -> Result<()>;

    /// Release a key
    fn release_key(&mut self, key: Key) -> Result<()>;
}
