//! Capturer: turns raw hook notifications into a timestamped event log

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Result;
use crate::input::{Clock, InputObserver, InputSink};
use crate::keys::Key;
use crate::types::{round_timestamp, Event, EventKind, MouseButton};

use super::types::EventLog;

/// State shared between the capturer and its hook sink
#[derive(Debug)]
struct CaptureBuffer {
    /// Whether callbacks should be appended
    recording: bool,
    /// Clock reading at session start
    start: Duration,
    /// Log being filled
    log: EventLog,
    /// Callbacks dropped because their payload was unusable
    dropped: usize,
}

impl CaptureBuffer {
    fn idle() -> Self {
        Self {
            recording: false,
            start: Duration::ZERO,
            log: EventLog::default(),
            dropped: 0,
        }
    }
}

/// Sink registered with the input observer while capturing
///
/// "Check state, stamp, append" happens under one lock so concurrent
/// pointer and keyboard callbacks cannot interleave or reorder.
struct CaptureSink {
    buffer: Arc<Mutex<CaptureBuffer>>,
    clock: Arc<dyn Clock>,
}

impl CaptureSink {
    fn append(&self, kind: Option<EventKind>) {
        let mut buffer = self.buffer.lock();
        if !buffer.recording {
            return;
        }
        let Some(kind) = kind else {
            buffer.dropped += 1;
            tracing::warn!("dropping malformed input event");
            return;
        };

        let elapsed = self.clock.now().saturating_sub(buffer.start);
        let event = Event::new(round_timestamp(elapsed.as_secs_f64()), kind);
        tracing::trace!(time = event.time, kind = event.kind.label(), "captured");
        buffer.log.append(event);
    }
}

/// Convert a raw coordinate, rejecting values that do not fit a screen position
fn to_coord(value: f64) -> Option<i32> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded < f64::from(i32::MIN) || rounded > f64::from(i32::MAX) {
        return None;
    }
    Some(rounded as i32)
}

fn to_delta(value: i64) -> Option<i32> {
    i32::try_from(value).ok()
}

impl InputSink for CaptureSink {
    fn on_move(&self, x: f64, y: f64) {
        let kind = to_coord(x)
            .zip(to_coord(y))
            .map(|(x, y)| EventKind::PointerMove { x, y });
        self.append(kind);
    }

    fn on_button(&self, x: f64, y: f64, button: MouseButton, pressed: bool) {
        let kind = to_coord(x)
            .zip(to_coord(y))
            .map(|(x, y)| EventKind::PointerButton {
                x,
                y,
                button,
                pressed,
            });
        self.append(kind);
    }

    fn on_scroll(&self, x: f64, y: f64, dx: i64, dy: i64) {
        let position = to_coord(x).zip(to_coord(y));
        let delta = to_delta(dx).zip(to_delta(dy));
        let kind = position
            .zip(delta)
            .map(|((x, y), (dx, dy))| EventKind::PointerScroll { x, y, dx, dy });
        self.append(kind);
    }

    fn on_key(&self, key: Key, pressed: bool) {
        self.append(Some(EventKind::KeyChange {
            key: key.to_repr(),
            pressed,
        }));
    }
}

/// Captures input notifications into an [`EventLog`]
pub struct Capturer {
    buffer: Arc<Mutex<CaptureBuffer>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Capturer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buffer = self.buffer.lock();
        f.debug_struct("Capturer")
            .field("recording", &buffer.recording)
            .field("events", &buffer.log.count())
            .finish()
    }
}

impl Capturer {
    /// Create an idle capturer reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(CaptureBuffer::idle())),
            clock,
        }
    }

    /// Check if capturing
    pub fn is_recording(&self) -> bool {
        self.buffer.lock().recording
    }

    /// Number of events captured so far in the current session
    pub fn event_count(&self) -> usize {
        self.buffer.lock().log.count()
    }

    /// Number of callbacks dropped in the current session
    pub fn dropped_count(&self) -> usize {
        self.buffer.lock().dropped
    }

    /// Begin a new capture session
    ///
    /// Resets the log, stamps the session start and registers with the
    /// observer. If registration fails the capturer is left idle.
    pub fn start(&mut self, observer: &mut dyn InputObserver) -> Result<()> {
        {
            let mut buffer = self.buffer.lock();
            buffer.log = EventLog::new(self.clock.wall_time());
            buffer.start = self.clock.now();
            buffer.dropped = 0;
            buffer.recording = true;
        }

        let sink = Arc::new(CaptureSink {
            buffer: Arc::clone(&self.buffer),
            clock: Arc::clone(&self.clock),
        });

        if let Err(e) = observer.register(sink) {
            *self.buffer.lock() = CaptureBuffer::idle();
            return Err(e);
        }
        Ok(())
    }

    /// End the capture session and return the frozen log
    ///
    /// The observer is unregistered first, so no callback can land after
    /// this returns.
    pub fn stop(&mut self, observer: &mut dyn InputObserver) -> EventLog {
        observer.unregister();

        let mut buffer = self.buffer.lock();
        buffer.recording = false;
        if buffer.dropped > 0 {
            tracing::warn!(dropped = buffer.dropped, "some input events were dropped");
        }
        std::mem::take(&mut buffer.log)
    }
}
