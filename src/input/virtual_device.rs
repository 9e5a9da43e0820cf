//! In-process input devices
//!
//! [`VirtualObserver`] and [`RecordingInjector`] stand in for the OS hook
//! when no real input device should be touched: in tests, in scripted
//! sessions, and in dry runs that only need to see what would be injected.
//!
//! Both are cheap handles over shared state. Clone one, hand the clone to a
//! [`SessionController`](crate::session::SessionController), and keep the
//! original to drive or inspect it.
//!
//! # Example
//!
//! ```
//! use macro_recorder::input::{InjectedCall, RecordingInjector, VirtualObserver};
//! use macro_recorder::{SessionController, StopOutcome};
//!
//! let observer = VirtualObserver::new();
//! let injector = RecordingInjector::new();
//! let mut controller = SessionController::new(observer.clone(), injector.clone());
//!
//! controller.start()?;
//! observer.emit_move(10.0, 20.0);
//! let StopOutcome::Recorded(log) = controller.stop()? else { unreachable!() };
//! assert_eq!(log.count(), 1);
//!
//! controller.play()?;
//! controller.join_playback();
//! assert_eq!(injector.calls(), vec![InjectedCall::Move { x: 10, y: 20 }]);
//! # Ok::<(), macro_recorder::MacroError>(())
//! ```

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::{MacroError, Result};
use crate::keys::Key;
use crate::types::MouseButton;

use super::{InputInjector, InputObserver, InputSink};

/// Observer whose notifications are fired by the caller
#[derive(Clone, Default)]
pub struct VirtualObserver {
    /// Registered sink; held locked while a notification is delivered
    slot: Arc<Mutex<Option<Arc<dyn InputSink>>>>,
    /// Error message to fail the next registrations with
    registration_error: Arc<Mutex<Option<String>>>,
}

impl std::fmt::Debug for VirtualObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualObserver")
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl VirtualObserver {
    /// Create an observer with nothing registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `register` calls fail with `message`
    pub fn fail_registration(&self, message: impl Into<String>) {
        *self.registration_error.lock() = Some(message.into());
    }

    /// Let `register` succeed again
    pub fn allow_registration(&self) {
        *self.registration_error.lock() = None;
    }

    /// Deliver a notification to the registered sink, if any
    ///
    /// Returns whether a sink received it.
    fn deliver(&self, notify: impl FnOnce(&dyn InputSink)) -> bool {
        let slot = self.slot.lock();
        match slot.as_ref() {
            Some(sink) => {
                notify(sink.as_ref());
                true
            }
            None => false,
        }
    }

    /// Fire a pointer move notification
    pub fn emit_move(&self, x: f64, y: f64) -> bool {
        self.deliver(|sink| sink.on_move(x, y))
    }

    /// Fire a button notification
    pub fn emit_button(&self, x: f64, y: f64, button: MouseButton, pressed: bool) -> bool {
        self.deliver(|sink| sink.on_button(x, y, button, pressed))
    }

    /// Fire a wheel notification
    pub fn emit_scroll(&self, x: f64, y: f64, dx: i64, dy: i64) -> bool {
        self.deliver(|sink| sink.on_scroll(x, y, dx, dy))
    }

    /// Fire a key notification
    pub fn emit_key(&self, key: Key, pressed: bool) -> bool {
        self.deliver(|sink| sink.on_key(key, pressed))
    }
}

impl InputObserver for VirtualObserver {
    fn register(&mut self, sink: Arc<dyn InputSink>) -> Result<()> {
        if let Some(message) = self.registration_error.lock().clone() {
            return Err(MacroError::HookRegistration(message));
        }
        *self.slot.lock() = Some(sink);
        Ok(())
    }

    fn unregister(&mut self) {
        self.slot.lock().take();
    }

    fn is_registered(&self) -> bool {
        self.slot.lock().is_some()
    }
}

/// A call received by a [`RecordingInjector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedCall {
    Move { x: i32, y: i32 },
    Press(MouseButton),
    Release(MouseButton),
    Scroll { dx: i32, dy: i32 },
    KeyDown(Key),
    KeyUp(Key),
}

#[derive(Debug, Default)]
struct InjectorLog {
    calls: Vec<(Instant, InjectedCall)>,
    failing: Vec<InjectedCall>,
}

/// Injector that records every call instead of touching the OS
#[derive(Debug, Clone, Default)]
pub struct RecordingInjector {
    log: Arc<Mutex<InjectorLog>>,
}

impl RecordingInjector {
    /// Create an empty injector
    pub fn new() -> Self {
        Self::default()
    }

    /// Make calls equal to `call` fail; they are not recorded
    pub fn fail_on(&self, call: InjectedCall) {
        self.log.lock().failing.push(call);
    }

    /// All successful calls, in order
    pub fn calls(&self) -> Vec<InjectedCall> {
        self.log.lock().calls.iter().map(|(_, call)| *call).collect()
    }

    /// All successful calls with the instant they were made
    pub fn timed_calls(&self) -> Vec<(Instant, InjectedCall)> {
        self.log.lock().calls.clone()
    }

    /// Number of successful calls
    pub fn call_count(&self) -> usize {
        self.log.lock().calls.len()
    }

    /// Forget recorded calls
    pub fn clear(&self) {
        self.log.lock().calls.clear();
    }

    fn record(&self, call: InjectedCall) -> Result<()> {
        let mut log = self.log.lock();
        if log.failing.contains(&call) {
            return Err(MacroError::Injection(format!("{:?} refused", call)));
        }
        log.calls.push((Instant::now(), call));
        Ok(())
    }
}

impl InputInjector for RecordingInjector {
    fn move_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.record(InjectedCall::Move { x, y })
    }

    fn press_button(&mut self, button: MouseButton) -> Result<()> {
        self.record(InjectedCall::Press(button))
    }

    fn release_button(&mut self, button: MouseButton) -> Result<()> {
        self.record(InjectedCall::Release(button))
    }

    fn scroll(&mut self, dx: i32, dy: i32) -> Result<()> {
        self.record(InjectedCall::Scroll { dx, dy })
    }

    fn press_key(&mut self, key: Key) -> Result<()> {
        self.record(InjectedCall::KeyDown(key))
    }

    fn release_key(&mut self, key: Key) -> Result<()> {
        self.record(InjectedCall::KeyUp(key))
    }
}
