//! Core event types shared by capture, replay and persistence

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::keys::KeyRepr;

/// Number of decimal places kept on captured timestamps
pub const TIMESTAMP_DECIMALS: i32 = 4;

/// Round a relative timestamp (seconds) to the stored precision
pub fn round_timestamp(seconds: f64) -> f64 {
    let scale = 10f64.powi(TIMESTAMP_DECIMALS);
    (seconds * scale).round() / scale
}

/// Mouse button identity
///
/// Serialized the way the legacy recorder printed buttons (`Button.left`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Stored name, e.g. `Button.left`
    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "Button.left",
            MouseButton::Right => "Button.right",
            MouseButton::Middle => "Button.middle",
        }
    }

    /// Parse a stored button name
    ///
    /// Matching is by substring; anything that names neither the left nor
    /// the middle button is treated as the right button, like the legacy
    /// tool did.
    pub fn parse_lenient(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("left") {
            MouseButton::Left
        } else if lower.contains("middle") {
            MouseButton::Middle
        } else {
            MouseButton::Right
        }
    }
}

impl std::fmt::Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MouseButton {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MouseButton {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(MouseButton::parse_lenient(&name))
    }
}

/// What happened in a single input event
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Pointer moved to an absolute position
    PointerMove { x: i32, y: i32 },
    /// Mouse button pressed or released at a position
    PointerButton {
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    /// Wheel scrolled at a position
    PointerScroll { x: i32, y: i32, dx: i32, dy: i32 },
    /// Keyboard key pressed or released
    KeyChange { key: KeyRepr, pressed: bool },
}

impl EventKind {
    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::PointerMove { .. } => "move",
            EventKind::PointerButton { .. } => "button",
            EventKind::PointerScroll { .. } => "scroll",
            EventKind::KeyChange { pressed: true, .. } => "key_press",
            EventKind::KeyChange { pressed: false, .. } => "key_release",
        }
    }

    /// Whether this is a pointer event
    pub fn is_pointer(&self) -> bool {
        !matches!(self, EventKind::KeyChange { .. })
    }
}

/// One normalized, timestamped input occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Seconds since session start, rounded to [`TIMESTAMP_DECIMALS`] places
    pub time: f64,
    /// Event payload
    pub kind: EventKind,
}

impl Event {
    /// Create a new event at a relative time
    pub fn new(time: f64, kind: EventKind) -> Self {
        Self { time, kind }
    }

    /// Pointer move
    pub fn pointer_move(time: f64, x: i32, y: i32) -> Self {
        Self::new(time, EventKind::PointerMove { x, y })
    }

    /// Button press/release
    pub fn pointer_button(time: f64, x: i32, y: i32, button: MouseButton, pressed: bool) -> Self {
        Self::new(
            time,
            EventKind::PointerButton {
                x,
                y,
                button,
                pressed,
            },
        )
    }

    /// Wheel scroll
    pub fn pointer_scroll(time: f64, x: i32, y: i32, dx: i32, dy: i32) -> Self {
        Self::new(time, EventKind::PointerScroll { x, y, dx, dy })
    }

    /// Key press/release
    pub fn key(time: f64, key: KeyRepr, pressed: bool) -> Self {
        Self::new(time, EventKind::KeyChange { key, pressed })
    }
}
