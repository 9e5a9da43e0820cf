//! JSON exchange format for event logs
//!
//! This is the persisted and streamed form of an [`EventLog`]:
//!
//! ```json
//! {
//!   "start_time": "2024-05-01T12:00:00.123456",
//!   "actions": [
//!     {"type": "mouse_move", "time": 0.0, "x": 10, "y": 20},
//!     {"type": "key_press", "time": 1.0, "key": "a"}
//!   ]
//! }
//! ```
//!
//! Writing always uses the `mouse_*` / `key_*` record names. Reading also
//! accepts the older `move` / `click` / `scroll` names, integer or float
//! coordinates, and ignores fields it does not know.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, ResultExt};
use crate::keys::KeyRepr;
use crate::types::{Event, EventKind, MouseButton};

use super::types::EventLog;

/// Format used for `start_time` when writing
pub const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One record in the `actions` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionRecord {
    #[serde(rename = "mouse_move", alias = "move")]
    MouseMove {
        time: f64,
        #[serde(deserialize_with = "coordinate")]
        x: i32,
        #[serde(deserialize_with = "coordinate")]
        y: i32,
    },
    #[serde(rename = "mouse_click", alias = "click")]
    MouseClick {
        time: f64,
        #[serde(deserialize_with = "coordinate")]
        x: i32,
        #[serde(deserialize_with = "coordinate")]
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    #[serde(rename = "mouse_scroll", alias = "scroll")]
    MouseScroll {
        time: f64,
        #[serde(deserialize_with = "coordinate")]
        x: i32,
        #[serde(deserialize_with = "coordinate")]
        y: i32,
        #[serde(deserialize_with = "coordinate")]
        dx: i32,
        #[serde(deserialize_with = "coordinate")]
        dy: i32,
    },
    #[serde(rename = "key_press")]
    KeyPress {
        time: f64,
        #[serde(deserialize_with = "nullable_key")]
        key: KeyRepr,
    },
    #[serde(rename = "key_release")]
    KeyRelease {
        time: f64,
        #[serde(deserialize_with = "nullable_key")]
        key: KeyRepr,
    },
}

/// Accept integer or float coordinates, rounding floats
fn coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i32, D::Error> {
    let value = f64::deserialize(deserializer)?.round();
    if value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return Err(serde::de::Error::custom(format!(
            "coordinate {} out of range",
            value
        )));
    }
    Ok(value as i32)
}

/// Keys the legacy recorder could not name were written as `null`
fn nullable_key<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<KeyRepr, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map_or_else(|| KeyRepr::Symbol("None".to_string()), |k| KeyRepr::parse(&k)))
}

impl From<&Event> for ActionRecord {
    fn from(event: &Event) -> Self {
        let time = event.time;
        match &event.kind {
            EventKind::PointerMove { x, y } => ActionRecord::MouseMove { time, x: *x, y: *y },
            EventKind::PointerButton {
                x,
                y,
                button,
                pressed,
            } => ActionRecord::MouseClick {
                time,
                x: *x,
                y: *y,
                button: *button,
                pressed: *pressed,
            },
            EventKind::PointerScroll { x, y, dx, dy } => ActionRecord::MouseScroll {
                time,
                x: *x,
                y: *y,
                dx: *dx,
                dy: *dy,
            },
            EventKind::KeyChange { key, pressed: true } => ActionRecord::KeyPress {
                time,
                key: key.clone(),
            },
            EventKind::KeyChange {
                key,
                pressed: false,
            } => ActionRecord::KeyRelease {
                time,
                key: key.clone(),
            },
        }
    }
}

impl From<ActionRecord> for Event {
    fn from(record: ActionRecord) -> Self {
        match record {
            ActionRecord::MouseMove { time, x, y } => Event::pointer_move(time, x, y),
            ActionRecord::MouseClick {
                time,
                x,
                y,
                button,
                pressed,
            } => Event::pointer_button(time, x, y, button, pressed),
            ActionRecord::MouseScroll { time, x, y, dx, dy } => {
                Event::pointer_scroll(time, x, y, dx, dy)
            }
            ActionRecord::KeyPress { time, key } => Event::key(time, key, true),
            ActionRecord::KeyRelease { time, key } => Event::key(time, key, false),
        }
    }
}

/// Top-level exchange document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeDocument {
    /// Informational session start time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Records in log order
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
}

impl ExchangeDocument {
    /// Build a document from a log
    pub fn from_log(log: &EventLog) -> Self {
        Self {
            start_time: Some(log.session_start().format(START_TIME_FORMAT).to_string()),
            actions: log.iter().map(ActionRecord::from).collect(),
        }
    }

    /// Convert into a log
    ///
    /// A missing or unparseable `start_time` falls back to the current
    /// local time. Records are kept in document order.
    pub fn into_log(self) -> EventLog {
        let session_start = self
            .start_time
            .as_deref()
            .and_then(parse_start_time)
            .unwrap_or_else(|| chrono::Local::now().naive_local());
        let events = self.actions.into_iter().map(Event::from).collect();
        EventLog::from_events(session_start, events)
    }
}

/// Parse a `start_time` value in any of the forms seen in the wild
pub fn parse_start_time(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];

    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    let parsed = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok());
    if parsed.is_none() {
        tracing::debug!(start_time = raw, "unrecognized start_time, ignoring");
    }
    parsed
}

/// Serialize a log as compact single-line JSON
pub fn to_json(log: &EventLog) -> Result<String> {
    Ok(serde_json::to_string(&ExchangeDocument::from_log(log))?)
}

/// Serialize a log as indented JSON
pub fn to_json_pretty(log: &EventLog) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ExchangeDocument::from_log(log))?)
}

/// Parse a log from JSON
pub fn from_json(json: &str) -> Result<EventLog> {
    let document: ExchangeDocument = serde_json::from_str(json)?;
    Ok(document.into_log())
}

/// Write a log to a file
pub fn save_to_file(log: &EventLog, path: &Path) -> Result<()> {
    let json = to_json_pretty(log)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Read a log from a file
pub fn load_from_file(path: &Path) -> Result<EventLog> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    from_json(&json).map_err(|e| e.with_context(format!("Failed to parse {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MacroError;
    use chrono::NaiveDate;

    fn sample_log() -> EventLog {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_micro_opt(12, 0, 0, 123_456))
            .unwrap();
        EventLog::from_events(
            start,
            vec![
                Event::pointer_move(0.0, 10, 20),
                Event::pointer_button(0.25, 10, 20, MouseButton::Left, true),
                Event::pointer_scroll(0.5, 10, 20, 0, -1),
                Event::key(1.0, KeyRepr::Char('a'), true),
                Event::key(1.05, KeyRepr::Symbol("Key.shift".to_string()), false),
            ],
        )
    }

    #[test]
    fn test_round_trip() {
        let log = sample_log();
        let json = to_json(&log).unwrap();
        let back = from_json(&json).unwrap();
        assert_eq!(back, log);
    }

    #[test]
    fn test_canonical_output() {
        let json = to_json(&sample_log()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["start_time"], "2024-05-01T12:00:00.123456");
        assert_eq!(
            value["actions"][0],
            serde_json::json!({"type": "mouse_move", "time": 0.0, "x": 10, "y": 20})
        );
        assert_eq!(value["actions"][1]["type"], "mouse_click");
        assert_eq!(value["actions"][1]["button"], "Button.left");
        assert_eq!(value["actions"][2]["type"], "mouse_scroll");
        assert_eq!(value["actions"][4]["key"], "Key.shift");
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_legacy_names_and_float_coordinates() {
        let json = r#"{"actions": [
            {"type": "move", "time": 0, "x": 10.4, "y": 19.6},
            {"type": "click", "time": 0.1, "x": 1, "y": 2, "button": "Button.middle", "pressed": false},
            {"type": "scroll", "time": 0.2, "x": 0, "y": 0, "dx": 0.0, "dy": -2.0},
            {"type": "key_press", "time": 0.3, "key": "'b'", "pressed": true}
        ]}"#;
        let log = from_json(json).unwrap();
        let events = log.events();

        assert_eq!(events[0], Event::pointer_move(0.0, 10, 20));
        assert_eq!(
            events[1],
            Event::pointer_button(0.1, 1, 2, MouseButton::Middle, false)
        );
        assert_eq!(events[2], Event::pointer_scroll(0.2, 0, 0, 0, -2));
        assert_eq!(events[3], Event::key(0.3, KeyRepr::Char('b'), true));
    }

    #[test]
    fn test_unknown_button_falls_back_to_right() {
        let json = r#"{"actions": [
            {"type": "mouse_click", "time": 0, "x": 0, "y": 0, "button": "Button.x2", "pressed": true}
        ]}"#;
        let log = from_json(json).unwrap();
        assert_eq!(
            log.events()[0],
            Event::pointer_button(0.0, 0, 0, MouseButton::Right, true)
        );
    }

    #[test]
    fn test_null_key_is_kept_unresolvable() {
        let json = r#"{"actions": [{"type": "key_press", "time": 0, "key": null}]}"#;
        let log = from_json(json).unwrap();
        let EventKind::KeyChange { key, .. } = &log.events()[0].kind else {
            panic!("expected a key event");
        };
        assert!(key.resolve().is_none());
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(from_json("{not json"), Err(MacroError::Codec(_))));
        assert!(from_json(r#"{"actions": [{"type": "teleport", "time": 0}]}"#).is_err());
        assert!(from_json(r#"{"actions": [{"type": "mouse_move", "time": 0, "x": 1e12, "y": 0}]}"#).is_err());
    }

    #[test]
    fn test_missing_fields_default() {
        let log = from_json("{}").unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_parse_start_time_variants() {
        assert!(parse_start_time("2024-05-01T12:00:00.123456").is_some());
        assert!(parse_start_time("2024-05-01 12:00:00").is_some());
        assert!(parse_start_time("2024-05-01T12:00:00+02:00").is_some());
        assert!(parse_start_time("yesterday").is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let log = sample_log();

        save_to_file(&log, &path).unwrap();
        assert_eq!(load_from_file(&path).unwrap(), log);
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
