//! rdev-backed OS hook and injector
//!
//! `rdev::listen` installs a process-wide hook that can be started once and
//! never returns. The listener thread is therefore started lazily on the
//! first registration and kept for the life of the process; observers
//! attach to it by placing their sink into a shared slot. Removing the sink
//! under the slot lock is what makes `unregister` synchronous.
//!
//! rdev reports button and wheel events without coordinates, so the
//! dispatcher tracks the last pointer position itself.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use parking_lot::Mutex;

use crate::error::{MacroError, Result};
use crate::keys::{Key, NamedKey};
use crate::types::MouseButton;

use super::{InputInjector, InputObserver, InputSink};

/// How long `register` waits for the listener to report a startup failure
const LISTEN_STARTUP_GRACE: Duration = Duration::from_millis(200);

#[derive(Default)]
struct DispatchState {
    sink: Option<Arc<dyn InputSink>>,
    position: (f64, f64),
    /// Characters produced by currently held keys, so releases match presses
    held_chars: Vec<(rdev::Key, char)>,
}

struct Dispatcher {
    state: Mutex<DispatchState>,
}

static DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();
static LISTENER: OnceLock<std::result::Result<(), String>> = OnceLock::new();

fn dispatcher() -> &'static Dispatcher {
    DISPATCHER.get_or_init(|| Dispatcher {
        state: Mutex::new(DispatchState::default()),
    })
}

/// Start the global listener thread once; later calls return the first outcome
fn ensure_listener() -> std::result::Result<(), String> {
    LISTENER
        .get_or_init(|| {
            let (err_tx, err_rx) = bounded::<String>(1);
            let spawned = std::thread::Builder::new()
                .name("input-hook".to_string())
                .spawn(move || {
                    if let Err(e) = rdev::listen(handle_event) {
                        let _ = err_tx.send(format!("{:?}", e));
                    }
                });
            if let Err(e) = spawned {
                return Err(format!("failed to spawn hook thread: {}", e));
            }
            match err_rx.recv_timeout(LISTEN_STARTUP_GRACE) {
                Ok(message) => Err(message),
                Err(RecvTimeoutError::Timeout) => Ok(()),
                Err(RecvTimeoutError::Disconnected) => {
                    Err("input hook thread exited".to_string())
                }
            }
        })
        .clone()
}

fn handle_event(event: rdev::Event) {
    let mut state = dispatcher().state.lock();
    let Some(sink) = state.sink.clone() else {
        return;
    };
    let (x, y) = state.position;

    let delivered = catch_unwind(AssertUnwindSafe(|| match event.event_type {
        rdev::EventType::MouseMove { x, y } => {
            state.position = (x, y);
            sink.on_move(x, y);
        }
        rdev::EventType::ButtonPress(button) => {
            if let Some(button) = from_rdev_button(button) {
                sink.on_button(x, y, button, true);
            }
        }
        rdev::EventType::ButtonRelease(button) => {
            if let Some(button) = from_rdev_button(button) {
                sink.on_button(x, y, button, false);
            }
        }
        rdev::EventType::Wheel { delta_x, delta_y } => {
            sink.on_scroll(x, y, delta_x, delta_y);
        }
        rdev::EventType::KeyPress(raw) => {
            match identify_key(raw, event.name.as_deref()) {
                Some(key) => {
                    if let Key::Char(c) = key {
                        state.held_chars.retain(|(held, _)| *held != raw);
                        state.held_chars.push((raw, c));
                    }
                    sink.on_key(key, true);
                }
                None => tracing::debug!(?raw, "ignoring unidentified key press"),
            }
        }
        rdev::EventType::KeyRelease(raw) => {
            let held = state
                .held_chars
                .iter()
                .position(|(held, _)| *held == raw)
                .map(|idx| state.held_chars.remove(idx).1);
            match held.map(Key::Char).or_else(|| identify_key(raw, None)) {
                Some(key) => sink.on_key(key, false),
                None => tracing::debug!(?raw, "ignoring unidentified key release"),
            }
        }
    }));

    if delivered.is_err() {
        tracing::warn!("input sink panicked; event dropped");
    }
}

fn from_rdev_button(button: rdev::Button) -> Option<MouseButton> {
    match button {
        rdev::Button::Left => Some(MouseButton::Left),
        rdev::Button::Right => Some(MouseButton::Right),
        rdev::Button::Middle => Some(MouseButton::Middle),
        rdev::Button::Unknown(_) => None,
    }
}

fn to_rdev_button(button: MouseButton) -> rdev::Button {
    match button {
        MouseButton::Left => rdev::Button::Left,
        MouseButton::Right => rdev::Button::Right,
        MouseButton::Middle => rdev::Button::Middle,
    }
}

/// Printable character if the key produced one, otherwise its symbolic name
fn identify_key(raw: rdev::Key, name: Option<&str>) -> Option<Key> {
    if let Some(named) = named_from_rdev(raw) {
        return Some(Key::Named(named));
    }
    let typed = name.and_then(|text| {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Some(c),
            _ => None,
        }
    });
    typed.or_else(|| char_from_rdev(raw)).map(Key::Char)
}

const NAMED_RDEV: &[(rdev::Key, NamedKey)] = &[
    (rdev::Key::Alt, NamedKey::Alt),
    (rdev::Key::AltGr, NamedKey::AltGr),
    (rdev::Key::Backspace, NamedKey::Backspace),
    (rdev::Key::CapsLock, NamedKey::CapsLock),
    (rdev::Key::ControlLeft, NamedKey::CtrlLeft),
    (rdev::Key::ControlRight, NamedKey::CtrlRight),
    (rdev::Key::Delete, NamedKey::Delete),
    (rdev::Key::DownArrow, NamedKey::Down),
    (rdev::Key::End, NamedKey::End),
    (rdev::Key::Escape, NamedKey::Esc),
    (rdev::Key::Home, NamedKey::Home),
    (rdev::Key::Insert, NamedKey::Insert),
    (rdev::Key::LeftArrow, NamedKey::Left),
    (rdev::Key::MetaLeft, NamedKey::CmdLeft),
    (rdev::Key::MetaRight, NamedKey::CmdRight),
    (rdev::Key::NumLock, NamedKey::NumLock),
    (rdev::Key::PageDown, NamedKey::PageDown),
    (rdev::Key::PageUp, NamedKey::PageUp),
    (rdev::Key::Pause, NamedKey::Pause),
    (rdev::Key::PrintScreen, NamedKey::PrintScreen),
    (rdev::Key::Return, NamedKey::Enter),
    (rdev::Key::KpReturn, NamedKey::Enter),
    (rdev::Key::RightArrow, NamedKey::Right),
    (rdev::Key::ScrollLock, NamedKey::ScrollLock),
    (rdev::Key::ShiftLeft, NamedKey::ShiftLeft),
    (rdev::Key::ShiftRight, NamedKey::ShiftRight),
    (rdev::Key::Space, NamedKey::Space),
    (rdev::Key::Tab, NamedKey::Tab),
    (rdev::Key::UpArrow, NamedKey::Up),
    (rdev::Key::F1, NamedKey::F(1)),
    (rdev::Key::F2, NamedKey::F(2)),
    (rdev::Key::F3, NamedKey::F(3)),
    (rdev::Key::F4, NamedKey::F(4)),
    (rdev::Key::F5, NamedKey::F(5)),
    (rdev::Key::F6, NamedKey::F(6)),
    (rdev::Key::F7, NamedKey::F(7)),
    (rdev::Key::F8, NamedKey::F(8)),
    (rdev::Key::F9, NamedKey::F(9)),
    (rdev::Key::F10, NamedKey::F(10)),
    (rdev::Key::F11, NamedKey::F(11)),
    (rdev::Key::F12, NamedKey::F(12)),
];

/// US-layout characters: (physical key, unshifted, shifted)
const CHAR_RDEV: &[(rdev::Key, char, char)] = &[
    (rdev::Key::KeyA, 'a', 'A'),
    (rdev::Key::KeyB, 'b', 'B'),
    (rdev::Key::KeyC, 'c', 'C'),
    (rdev::Key::KeyD, 'd', 'D'),
    (rdev::Key::KeyE, 'e', 'E'),
    (rdev::Key::KeyF, 'f', 'F'),
    (rdev::Key::KeyG, 'g', 'G'),
    (rdev::Key::KeyH, 'h', 'H'),
    (rdev::Key::KeyI, 'i', 'I'),
    (rdev::Key::KeyJ, 'j', 'J'),
    (rdev::Key::KeyK, 'k', 'K'),
    (rdev::Key::KeyL, 'l', 'L'),
    (rdev::Key::KeyM, 'm', 'M'),
    (rdev::Key::KeyN, 'n', 'N'),
    (rdev::Key::KeyO, 'o', 'O'),
    (rdev::Key::KeyP, 'p', 'P'),
    (rdev::Key::KeyQ, 'q', 'Q'),
    (rdev::Key::KeyR, 'r', 'R'),
    (rdev::Key::KeyS, 's', 'S'),
    (rdev::Key::KeyT, 't', 'T'),
    (rdev::Key::KeyU, 'u', 'U'),
    (rdev::Key::KeyV, 'v', 'V'),
    (rdev::Key::KeyW, 'w', 'W'),
    (rdev::Key::KeyX, 'x', 'X'),
    (rdev::Key::KeyY, 'y', 'Y'),
    (rdev::Key::KeyZ, 'z', 'Z'),
    (rdev::Key::Num1, '1', '!'),
    (rdev::Key::Num2, '2', '@'),
    (rdev::Key::Num3, '3', '#'),
    (rdev::Key::Num4, '4', '$'),
    (rdev::Key::Num5, '5', '%'),
    (rdev::Key::Num6, '6', '^'),
    (rdev::Key::Num7, '7', '&'),
    (rdev::Key::Num8, '8', '*'),
    (rdev::Key::Num9, '9', '('),
    (rdev::Key::Num0, '0', ')'),
    (rdev::Key::BackQuote, '`', '~'),
    (rdev::Key::Minus, '-', '_'),
    (rdev::Key::Equal, '=', '+'),
    (rdev::Key::LeftBracket, '[', '{'),
    (rdev::Key::RightBracket, ']', '}'),
    (rdev::Key::BackSlash, '\\', '|'),
    (rdev::Key::SemiColon, ';', ':'),
    (rdev::Key::Quote, '\'', '"'),
    (rdev::Key::Comma, ',', '<'),
    (rdev::Key::Dot, '.', '>'),
    (rdev::Key::Slash, '/', '?'),
];

fn named_from_rdev(raw: rdev::Key) -> Option<NamedKey> {
    NAMED_RDEV
        .iter()
        .find(|(key, _)| *key == raw)
        .map(|(_, named)| *named)
}

fn char_from_rdev(raw: rdev::Key) -> Option<char> {
    CHAR_RDEV
        .iter()
        .find(|(key, _, _)| *key == raw)
        .map(|(_, plain, _)| *plain)
}

fn to_rdev_key(key: Key) -> Option<rdev::Key> {
    match key {
        Key::Named(named) => {
            // Generic modifiers have no side; inject the left one
            let named = match named {
                NamedKey::Ctrl => NamedKey::CtrlLeft,
                NamedKey::Shift => NamedKey::ShiftLeft,
                NamedKey::Cmd => NamedKey::CmdLeft,
                NamedKey::AltLeft => NamedKey::Alt,
                other => other,
            };
            NAMED_RDEV
                .iter()
                .find(|(_, candidate)| *candidate == named)
                .map(|(raw, _)| *raw)
        }
        Key::Char(' ') => Some(rdev::Key::Space),
        Key::Char(c) => CHAR_RDEV
            .iter()
            .find(|(_, plain, shifted)| *plain == c || *shifted == c)
            .map(|(raw, _, _)| *raw),
    }
}

/// OS hook observer backed by `rdev::listen`
#[derive(Debug, Default)]
pub struct NativeObserver {
    registered: bool,
}

impl NativeObserver {
    /// Create an observer; the hook is installed on first registration
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputObserver for NativeObserver {
    fn register(&mut self, sink: Arc<dyn InputSink>) -> Result<()> {
        ensure_listener().map_err(MacroError::HookRegistration)?;

        let mut state = dispatcher().state.lock();
        if state.sink.is_some() && !self.registered {
            return Err(MacroError::HookRegistration(
                "another observer already owns the input hook".to_string(),
            ));
        }
        state.sink = Some(sink);
        state.held_chars.clear();
        self.registered = true;
        tracing::debug!("native input hook attached");
        Ok(())
    }

    fn unregister(&mut self) {
        if !self.registered {
            return;
        }
        let mut state = dispatcher().state.lock();
        state.sink = None;
        state.held_chars.clear();
        self.registered = false;
        tracing::debug!("native input hook detached");
    }

    fn is_registered(&self) -> bool {
        self.registered
    }
}

impl Drop for NativeObserver {
    fn drop(&mut self) {
        self.unregister();
    }
}

/// Injector backed by `rdev::simulate`
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeInjector;

impl NativeInjector {
    /// Create an injector
    pub fn new() -> Self {
        Self
    }

    fn send(&self, event: rdev::EventType) -> Result<()> {
        rdev::simulate(&event)
            .map_err(|_| MacroError::Injection(format!("could not simulate {:?}", event)))
    }
}

impl InputInjector for NativeInjector {
    fn move_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.send(rdev::EventType::MouseMove {
            x: f64::from(x),
            y: f64::from(y),
        })
    }

    fn press_button(&mut self, button: MouseButton) -> Result<()> {
        self.send(rdev::EventType::ButtonPress(to_rdev_button(button)))
    }

    fn release_button(&mut self, button: MouseButton) -> Result<()> {
        self.send(rdev::EventType::ButtonRelease(to_rdev_button(button)))
    }

    fn scroll(&mut self, dx: i32, dy: i32) -> Result<()> {
        self.send(rdev::EventType::Wheel {
            delta_x: i64::from(dx),
            delta_y: i64::from(dy),
        })
    }

    fn press_key(&mut self, key: Key) -> Result<()> {
        let raw = to_rdev_key(key).ok_or_else(|| MacroError::KeyResolution(key.to_string()))?;
        self.send(rdev::EventType::KeyPress(raw))
    }

    fn release_key(&mut self, key: Key) -> Result<()> {
        let raw = to_rdev_key(key).ok_or_else(|| MacroError::KeyResolution(key.to_string()))?;
        self.send(rdev::EventType::KeyRelease(raw))
    }
}
