//! Replayer: re-injects a frozen event log with its original timing
//!
//! The replay loop runs on its own thread. Before each event it works out
//! how long to wait from the event's timestamp and the time elapsed since
//! playback started, sleeps for that long, then dispatches the event to
//! the injector.
//!
//! Sleeping is done by waiting on the stop channel, so a stop request wakes
//! the replay immediately instead of after the current gap. Keys or buttons
//! that are held down when a replay is cancelled stay held down.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::error::{MacroError, Result};
use crate::input::{Clock, InputInjector};
use crate::types::{Event, EventKind};

use super::types::{EventLog, ReplayReport, SessionNotice};

/// Injector shared between the controller and its replay thread
pub type SharedInjector = Arc<Mutex<Box<dyn InputInjector>>>;

/// Slowest allowed playback speed multiplier
pub const MIN_SPEED: f64 = 0.1;
/// Fastest allowed playback speed multiplier
pub const MAX_SPEED: f64 = 10.0;
/// Default pause between repetitions
pub const DEFAULT_REPEAT_GAP: Duration = Duration::from_millis(500);
/// Unread notices above which progress notices are no longer queued
pub const PROGRESS_BACKLOG: usize = 4096;

/// How many times to play the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// A fixed number of passes (at least one)
    Times(u32),
    /// Until stopped
    Forever,
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::Times(1)
    }
}

/// Playback configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// Speed multiplier (1.0 = original timing)
    pub speed: f64,
    /// Number of passes
    pub repeat: Repeat,
    /// Pause between passes
    pub repeat_gap: Duration,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            repeat: Repeat::default(),
            repeat_gap: DEFAULT_REPEAT_GAP,
        }
    }
}

impl PlaybackOptions {
    /// Set the speed multiplier, clamped to the supported range
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = if speed.is_finite() {
            speed.clamp(MIN_SPEED, MAX_SPEED)
        } else {
            1.0
        };
        self
    }

    /// Set the repeat mode
    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Set the pause between passes
    pub fn with_repeat_gap(mut self, gap: Duration) -> Self {
        self.repeat_gap = gap;
        self
    }

    fn passes(&self) -> Option<u32> {
        match self.repeat {
            Repeat::Times(n) => Some(n.max(1)),
            Repeat::Forever => None,
        }
    }
}

/// Sending half of a replay stop request
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    /// Ask the replay to stop; repeated calls are harmless
    pub fn stop(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Receiving half of a replay stop request
///
/// Once a stop is observed it stays observed. Dropping every
/// [`StopHandle`] also counts as a stop.
#[derive(Debug)]
pub struct StopSignal {
    rx: Receiver<()>,
    raised: bool,
}

impl StopSignal {
    /// Check for a stop request without blocking
    pub fn is_raised(&mut self) -> bool {
        if !self.raised {
            self.raised = match self.rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => true,
                Err(TryRecvError::Empty) => false,
            };
        }
        self.raised
    }

    /// Sleep for `duration` or until stopped; returns whether stopped
    pub fn sleep(&mut self, duration: Duration) -> bool {
        if self.raised {
            return true;
        }
        self.raised = match self.rx.recv_timeout(duration) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        };
        self.raised
    }
}

/// Create a linked stop handle and signal
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = bounded(1);
    (StopHandle { tx }, StopSignal { rx, raised: false })
}

/// Replays an [`EventLog`] through an injector
pub struct Replayer {
    log: Arc<EventLog>,
    injector: SharedInjector,
    clock: Arc<dyn Clock>,
    options: PlaybackOptions,
    notices: Option<Sender<SessionNotice>>,
}

impl std::fmt::Debug for Replayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replayer")
            .field("events", &self.log.count())
            .field("options", &self.options)
            .finish()
    }
}

impl Replayer {
    /// Create a replayer over a frozen log
    pub fn new(log: Arc<EventLog>, injector: SharedInjector, clock: Arc<dyn Clock>) -> Self {
        Self {
            log,
            injector,
            clock,
            options: PlaybackOptions::default(),
            notices: None,
        }
    }

    /// Use these playback options
    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    /// Publish progress notices on this channel
    ///
    /// A notice is skipped while the channel holds [`PROGRESS_BACKLOG`]
    /// or more unread notices.
    pub fn with_notices(mut self, notices: Sender<SessionNotice>) -> Self {
        self.notices = Some(notices);
        self
    }

    /// Run every pass until done or stopped
    pub fn run(&self, stop: &mut StopSignal) -> ReplayReport {
        let mut report = ReplayReport::default();
        let passes = self.options.passes();

        tracing::info!(
            events = self.log.count(),
            speed = self.options.speed,
            passes = ?passes,
            "replay started"
        );

        loop {
            if passes.is_some_and(|n| report.iterations >= n) {
                break;
            }
            if report.iterations > 0 && stop.sleep(self.options.repeat_gap) {
                report.cancelled = true;
                break;
            }

            report.iterations += 1;
            if !self.play_pass(stop, &mut report) {
                report.cancelled = true;
                break;
            }
        }

        tracing::info!(
            dispatched = report.dispatched,
            skipped = report.skipped,
            iterations = report.iterations,
            cancelled = report.cancelled,
            "replay finished"
        );
        report
    }

    /// One pass over the log; returns false if stopped part-way
    fn play_pass(&self, stop: &mut StopSignal, report: &mut ReplayReport) -> bool {
        let total = self.log.count();
        let playback_start = self.clock.now();

        for (index, event) in self.log.iter().enumerate() {
            if stop.is_raised() {
                return false;
            }

            let elapsed = self.clock.now().saturating_sub(playback_start);
            let target = event.time / self.options.speed;
            let wait = target - elapsed.as_secs_f64();
            if wait > 0.0 {
                let wait = Duration::try_from_secs_f64(wait).unwrap_or(Duration::MAX);
                if stop.sleep(wait) {
                    return false;
                }
            }

            match self.dispatch(event) {
                Ok(()) => report.dispatched += 1,
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!(time = event.time, kind = event.kind.label(), "skipping event: {}", e);
                }
            }

            if let Some(notices) = &self.notices {
                if notices.len() < PROGRESS_BACKLOG {
                    let _ = notices.send(SessionNotice::PlaybackProgress {
                        processed: index + 1,
                        total,
                    });
                }
            }
        }
        true
    }

    /// Hand one event to the injector
    fn dispatch(&self, event: &Event) -> Result<()> {
        let mut injector = self.injector.lock();
        match &event.kind {
            EventKind::PointerMove { x, y } => injector.move_pointer(*x, *y),
            EventKind::PointerButton {
                button, pressed, ..
            } => {
                if *pressed {
                    injector.press_button(*button)
                } else {
                    injector.release_button(*button)
                }
            }
            EventKind::PointerScroll { dx, dy, .. } => injector.scroll(*dx, *dy),
            EventKind::KeyChange { key, pressed } => {
                let resolved = key
                    .resolve()
                    .ok_or_else(|| MacroError::KeyResolution(key.as_string()))?;
                if *pressed {
                    injector.press_key(resolved)
                } else {
                    injector.release_key(resolved)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InjectedCall, MockInputInjector, RecordingInjector, SystemClock};
    use crate::keys::{Key, KeyRepr};
    use crate::types::MouseButton;
    use mockall::Sequence;

    fn shared(injector: impl InputInjector + 'static) -> SharedInjector {
        Arc::new(Mutex::new(Box::new(injector)))
    }

    fn log_of(events: Vec<Event>) -> Arc<EventLog> {
        Arc::new(EventLog::from_events(
            chrono::Local::now().naive_local(),
            events,
        ))
    }

    #[test]
    fn test_dispatch_order_with_mock() {
        let mut mock = MockInputInjector::new();
        let mut seq = Sequence::new();
        mock.expect_move_pointer()
            .withf(|x, y| *x == 10 && *y == 20)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        mock.expect_press_button()
            .withf(|b| *b == MouseButton::Left)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_scroll()
            .withf(|dx, dy| *dx == 0 && *dy == -2)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        mock.expect_press_key()
            .withf(|k| *k == Key::Char('a'))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_release_key()
            .withf(|k| *k == Key::Char('a'))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let log = log_of(vec![
            Event::pointer_move(0.0, 10, 20),
            Event::pointer_button(0.0, 10, 20, MouseButton::Left, true),
            Event::pointer_scroll(0.0, 10, 20, 0, -2),
            Event::key(0.0, KeyRepr::Char('a'), true),
            Event::key(0.0, KeyRepr::Char('a'), false),
        ]);

        let replayer = Replayer::new(log, shared(mock), Arc::new(SystemClock::new()));
        let (_handle, mut signal) = stop_channel();
        let report = replayer.run(&mut signal);

        assert_eq!(report.dispatched, 5);
        assert_eq!(report.skipped, 0);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_unresolvable_keys_are_skipped() {
        let injector = RecordingInjector::new();
        let log = log_of(vec![
            Event::key(0.0, KeyRepr::Symbol("Key.hyper".to_string()), true),
            Event::key(0.0, KeyRepr::Char('b'), true),
        ]);

        let replayer = Replayer::new(log, shared(injector.clone()), Arc::new(SystemClock::new()));
        let (_handle, mut signal) = stop_channel();
        let report = replayer.run(&mut signal);

        assert_eq!(report.dispatched, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(injector.calls(), vec![InjectedCall::KeyDown(Key::Char('b'))]);
    }

    #[test]
    fn test_injection_failures_do_not_abort() {
        let injector = RecordingInjector::new();
        injector.fail_on(InjectedCall::Move { x: 1, y: 1 });
        let log = log_of(vec![
            Event::pointer_move(0.0, 1, 1),
            Event::pointer_move(0.0, 2, 2),
        ]);

        let replayer = Replayer::new(log, shared(injector.clone()), Arc::new(SystemClock::new()));
        let (_handle, mut signal) = stop_channel();
        let report = replayer.run(&mut signal);

        assert_eq!(report.skipped, 1);
        assert_eq!(injector.calls(), vec![InjectedCall::Move { x: 2, y: 2 }]);
    }

    #[test]
    fn test_stop_before_start_dispatches_nothing() {
        let injector = RecordingInjector::new();
        let log = log_of(vec![Event::pointer_move(0.0, 1, 1)]);

        let replayer = Replayer::new(log, shared(injector.clone()), Arc::new(SystemClock::new()));
        let (handle, mut signal) = stop_channel();
        handle.stop();
        let report = replayer.run(&mut signal);

        assert!(report.cancelled);
        assert_eq!(injector.call_count(), 0);
    }

    #[test]
    fn test_dropped_handle_counts_as_stop() {
        let (handle, mut signal) = stop_channel();
        drop(handle);
        assert!(signal.is_raised());
        assert!(signal.sleep(Duration::from_secs(5)));
    }

    #[test]
    fn test_repeat_passes() {
        let injector = RecordingInjector::new();
        let log = log_of(vec![Event::pointer_move(0.0, 3, 4)]);
        let options = PlaybackOptions::default()
            .with_repeat(Repeat::Times(3))
            .with_repeat_gap(Duration::from_millis(1));

        let replayer = Replayer::new(log, shared(injector.clone()), Arc::new(SystemClock::new()))
            .with_options(options);
        let (_handle, mut signal) = stop_channel();
        let report = replayer.run(&mut signal);

        assert_eq!(report.iterations, 3);
        assert_eq!(report.dispatched, 3);
        assert_eq!(injector.call_count(), 3);
    }

    #[test]
    fn test_progress_notices() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let log = log_of(vec![
            Event::pointer_move(0.0, 0, 0),
            Event::pointer_move(0.0, 1, 1),
        ]);

        let replayer = Replayer::new(
            log,
            shared(RecordingInjector::new()),
            Arc::new(SystemClock::new()),
        )
        .with_notices(tx);
        let (_handle, mut signal) = stop_channel();
        replayer.run(&mut signal);

        let notices: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            notices,
            vec![
                SessionNotice::PlaybackProgress {
                    processed: 1,
                    total: 2
                },
                SessionNotice::PlaybackProgress {
                    processed: 2,
                    total: 2
                },
            ]
        );
    }

    #[test]
    fn test_progress_counts_skipped_events() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let log = log_of(vec![
            Event::key(0.0, KeyRepr::Symbol("Key.hyper".to_string()), true),
            Event::pointer_move(0.0, 1, 1),
        ]);

        let replayer = Replayer::new(
            log,
            shared(RecordingInjector::new()),
            Arc::new(SystemClock::new()),
        )
        .with_notices(tx);
        let (_handle, mut signal) = stop_channel();
        let report = replayer.run(&mut signal);

        assert_eq!(report.dispatched, 1);
        assert_eq!(
            rx.try_iter().last(),
            Some(SessionNotice::PlaybackProgress {
                processed: 2,
                total: 2
            })
        );
    }

    #[test]
    fn test_progress_stops_at_backlog() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let log = log_of(
            (0..PROGRESS_BACKLOG + 10)
                .map(|i| Event::pointer_move(0.0, i as i32, 0))
                .collect(),
        );

        let replayer = Replayer::new(
            log,
            shared(RecordingInjector::new()),
            Arc::new(SystemClock::new()),
        )
        .with_notices(tx);
        let (_handle, mut signal) = stop_channel();
        let report = replayer.run(&mut signal);

        assert_eq!(report.dispatched, PROGRESS_BACKLOG + 10);
        assert_eq!(rx.len(), PROGRESS_BACKLOG);
    }

    #[test]
    fn test_speed_is_clamped() {
        assert_eq!(PlaybackOptions::default().with_speed(100.0).speed, MAX_SPEED);
        assert_eq!(PlaybackOptions::default().with_speed(0.0).speed, MIN_SPEED);
        assert_eq!(PlaybackOptions::default().with_speed(f64::NAN).speed, 1.0);
        assert_eq!(PlaybackOptions::default().with_repeat(Repeat::Times(0)).passes(), Some(1));
    }
}
