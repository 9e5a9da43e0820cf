//! Key identity: stored representation and injectable keys
//!
//! Captured keys are stored either as the literal character they produce or
//! as a symbolic name of the form `Key.<name>` (for example `Key.shift` or
//! `Key.f5`). At injection time the stored form is resolved back through
//! the symbolic-key table; a literal character always resolves to itself.
//!
//! The table is a best-effort normalization. Names that are not in it are
//! kept verbatim so they survive a save/load cycle, but they do not resolve
//! and are skipped during replay.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Prefix used for symbolic key names
pub const SYMBOL_PREFIX: &str = "Key.";

/// Highest function key number recognized
const MAX_FUNCTION_KEY: u8 = 20;

/// A non-printable key with a symbolic name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Alt,
    AltLeft,
    AltRight,
    AltGr,
    Backspace,
    CapsLock,
    Cmd,
    CmdLeft,
    CmdRight,
    Ctrl,
    CtrlLeft,
    CtrlRight,
    Delete,
    Down,
    End,
    Enter,
    Esc,
    Home,
    Insert,
    Left,
    Menu,
    NumLock,
    PageDown,
    PageUp,
    Pause,
    PrintScreen,
    Right,
    ScrollLock,
    Shift,
    ShiftLeft,
    ShiftRight,
    Space,
    Tab,
    Up,
    MediaPlayPause,
    MediaVolumeMute,
    MediaVolumeDown,
    MediaVolumeUp,
    MediaPrevious,
    MediaNext,
    /// Function key `F1`..=`F20`
    F(u8),
}

const NAMED_KEYS: &[(&str, NamedKey)] = &[
    ("alt", NamedKey::Alt),
    ("alt_l", NamedKey::AltLeft),
    ("alt_r", NamedKey::AltRight),
    ("alt_gr", NamedKey::AltGr),
    ("backspace", NamedKey::Backspace),
    ("caps_lock", NamedKey::CapsLock),
    ("cmd", NamedKey::Cmd),
    ("cmd_l", NamedKey::CmdLeft),
    ("cmd_r", NamedKey::CmdRight),
    ("ctrl", NamedKey::Ctrl),
    ("ctrl_l", NamedKey::CtrlLeft),
    ("ctrl_r", NamedKey::CtrlRight),
    ("delete", NamedKey::Delete),
    ("down", NamedKey::Down),
    ("end", NamedKey::End),
    ("enter", NamedKey::Enter),
    ("esc", NamedKey::Esc),
    ("home", NamedKey::Home),
    ("insert", NamedKey::Insert),
    ("left", NamedKey::Left),
    ("menu", NamedKey::Menu),
    ("num_lock", NamedKey::NumLock),
    ("page_down", NamedKey::PageDown),
    ("page_up", NamedKey::PageUp),
    ("pause", NamedKey::Pause),
    ("print_screen", NamedKey::PrintScreen),
    ("right", NamedKey::Right),
    ("scroll_lock", NamedKey::ScrollLock),
    ("shift", NamedKey::Shift),
    ("shift_l", NamedKey::ShiftLeft),
    ("shift_r", NamedKey::ShiftRight),
    ("space", NamedKey::Space),
    ("tab", NamedKey::Tab),
    ("up", NamedKey::Up),
    ("media_play_pause", NamedKey::MediaPlayPause),
    ("media_volume_mute", NamedKey::MediaVolumeMute),
    ("media_volume_down", NamedKey::MediaVolumeDown),
    ("media_volume_up", NamedKey::MediaVolumeUp),
    ("media_previous", NamedKey::MediaPrevious),
    ("media_next", NamedKey::MediaNext),
];

impl NamedKey {
    /// Look up a symbolic name (without the `Key.` prefix), case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();

        if let Some(number) = lower.strip_prefix('f') {
            if let Ok(n) = number.parse::<u8>() {
                return (1..=MAX_FUNCTION_KEY).contains(&n).then_some(NamedKey::F(n));
            }
        }

        NAMED_KEYS
            .iter()
            .find(|(candidate, _)| *candidate == lower)
            .map(|(_, key)| *key)
    }

    /// Symbolic name without the prefix
    pub fn name(&self) -> String {
        if let NamedKey::F(n) = self {
            return format!("f{}", n);
        }
        NAMED_KEYS
            .iter()
            .find(|(_, key)| key == self)
            .map(|(name, _)| (*name).to_string())
            .unwrap_or_default()
    }
}

/// A key the injector can press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable character, typed literally
    Char(char),
    /// Non-printable key
    Named(NamedKey),
}

impl Key {
    /// Stored representation of this key
    pub fn to_repr(&self) -> KeyRepr {
        match self {
            Key::Char(c) => KeyRepr::Char(*c),
            Key::Named(named) => KeyRepr::Symbol(format!("{}{}", SYMBOL_PREFIX, named.name())),
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{:?}", c),
            Key::Named(named) => write!(f, "{}{}", SYMBOL_PREFIX, named.name()),
        }
    }
}

/// Key as stored in an event log
///
/// Serialized as a plain string: the literal character, or the symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyRepr {
    /// Literal printable character
    Char(char),
    /// Symbolic name, normally `Key.<name>`
    Symbol(String),
}

impl KeyRepr {
    /// Parse a stored key string
    ///
    /// A single character is a literal. A quoted single character (`'a'`) is
    /// unquoted. Everything else is kept as a symbolic name.
    pub fn parse(raw: &str) -> Self {
        let mut chars = raw.chars();
        match (chars.next(), chars.next(), chars.next(), chars.next()) {
            (Some(c), None, _, _) => KeyRepr::Char(c),
            (Some('\''), Some(c), Some('\''), None) => KeyRepr::Char(c),
            _ => KeyRepr::Symbol(raw.to_string()),
        }
    }

    /// Stored string form
    pub fn as_string(&self) -> String {
        match self {
            KeyRepr::Char(c) => c.to_string(),
            KeyRepr::Symbol(name) => name.clone(),
        }
    }

    /// Resolve back to an injectable key
    ///
    /// Returns `None` for symbolic names missing from the key table.
    pub fn resolve(&self) -> Option<Key> {
        match self {
            KeyRepr::Char(c) => Some(Key::Char(*c)),
            KeyRepr::Symbol(name) => name
                .strip_prefix(SYMBOL_PREFIX)
                .and_then(NamedKey::from_name)
                .map(Key::Named),
        }
    }
}

impl From<Key> for KeyRepr {
    fn from(key: Key) -> Self {
        key.to_repr()
    }
}

impl std::fmt::Display for KeyRepr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl Serialize for KeyRepr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

impl<'de> Deserialize<'de> for KeyRepr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(KeyRepr::parse(&raw))
    }
}
