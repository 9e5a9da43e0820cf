//! Session controller: the Idle / Recording / Playing state machine
//!
//! The controller owns the capture and replay components and the current
//! event log. Front-ends (the interactive CLI and the line protocol) drive it
//! through four commands:
//!
//! ```text
//! Idle --start()--> Recording --stop()--> Idle --play()--> Playing --(complete | stop())--> Idle
//! ```
//!
//! Commands that are not legal in the current state return
//! [`MacroError::Rejected`] and change nothing. Replay runs on a background
//! thread; the controller never waits for it except in [`quit`] and
//! [`join_playback`].
//!
//! [`quit`]: SessionController::quit
//! [`join_playback`]: SessionController::join_playback

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{MacroError, Rejection, Result};
use crate::input::{Clock, InputInjector, InputObserver, SystemClock};

use super::player::{stop_channel, PlaybackOptions, Replayer, SharedInjector, StopHandle};
use super::recorder::Capturer;
use super::types::{EventLog, ReplayReport, SessionNotice, SessionState};

/// Result of a [`SessionController::stop`] call
#[derive(Debug, Clone)]
pub enum StopOutcome {
    /// A capture ended and produced this log
    Recorded(Arc<EventLog>),
    /// Replay was asked to stop; it ends within one inter-event gap
    PlaybackStopping,
    /// Nothing was running
    Idle,
}

/// Background replay thread and its stop handle
struct Playback {
    stop: StopHandle,
    thread: JoinHandle<ReplayReport>,
}

/// Owns one capture/replay session
pub struct SessionController {
    observer: Box<dyn InputObserver>,
    injector: SharedInjector,
    clock: Arc<dyn Clock>,
    capturer: Capturer,
    state: Arc<Mutex<SessionState>>,
    log: Arc<EventLog>,
    options: PlaybackOptions,
    notice_tx: Sender<SessionNotice>,
    notice_rx: Receiver<SessionNotice>,
    playback: Option<Playback>,
    shut_down: bool,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &*self.state.lock())
            .field("events", &self.log.count())
            .field("options", &self.options)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

impl SessionController {
    /// Create a controller using the system clock
    pub fn new(
        observer: impl InputObserver + 'static,
        injector: impl InputInjector + 'static,
    ) -> Self {
        Self::with_clock(observer, injector, Arc::new(SystemClock::new()))
    }

    /// Create a controller reading time from `clock`
    pub fn with_clock(
        observer: impl InputObserver + 'static,
        injector: impl InputInjector + 'static,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (notice_tx, notice_rx) = unbounded();
        Self {
            observer: Box::new(observer),
            injector: Arc::new(Mutex::new(Box::new(injector))),
            capturer: Capturer::new(Arc::clone(&clock)),
            clock,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            log: Arc::new(EventLog::default()),
            options: PlaybackOptions::default(),
            notice_tx,
            notice_rx,
            playback: None,
            shut_down: false,
        }
    }

    /// Use these playback options for subsequent `play()` calls
    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Receiver for transition and progress notices
    ///
    /// Transition notices are always delivered. Progress notices are
    /// dropped while [`PROGRESS_BACKLOG`](super::player::PROGRESS_BACKLOG)
    /// or more notices sit unread.
    pub fn notices(&self) -> Receiver<SessionNotice> {
        self.notice_rx.clone()
    }

    /// Take every notice currently queued
    pub fn drain_notices(&self) -> Vec<SessionNotice> {
        self.notice_rx.try_iter().collect()
    }

    /// The current event log
    pub fn log(&self) -> Arc<EventLog> {
        Arc::clone(&self.log)
    }

    /// Replace the current log, e.g. with one read from disk
    pub fn load(&mut self, log: EventLog) -> Result<()> {
        self.ensure_idle()?;
        tracing::debug!(events = log.count(), "log loaded");
        self.log = Arc::new(log);
        Ok(())
    }

    /// Begin capturing input
    ///
    /// Hook registration failure is returned as-is and leaves the
    /// controller idle.
    pub fn start(&mut self) -> Result<()> {
        if let Err(e) = self.ensure_idle() {
            if e.rejection() == Some(Rejection::RecordingActive) {
                return Err(Rejection::AlreadyRecording.into());
            }
            return Err(e);
        }

        self.capturer.start(self.observer.as_mut())?;
        *self.state.lock() = SessionState::Recording;
        tracing::info!("recording started");
        self.notify(SessionNotice::RecordingStarted);
        Ok(())
    }

    /// Stop whatever is running
    ///
    /// Stopping a capture unregisters the hook before returning and freezes
    /// the log. Stopping a replay only signals it; the replay thread moves
    /// the state back to idle when it notices. With nothing running this
    /// succeeds and does nothing.
    pub fn stop(&mut self) -> Result<StopOutcome> {
        self.reap_playback();
        let state = self.state();
        match state {
            SessionState::Idle => Ok(StopOutcome::Idle),
            SessionState::Recording => {
                let log = Arc::new(self.capturer.stop(self.observer.as_mut()));
                *self.state.lock() = SessionState::Idle;
                self.log = Arc::clone(&log);
                tracing::info!(events = log.count(), "recording stopped");
                self.notify(SessionNotice::RecordingStopped {
                    events: log.count(),
                });
                Ok(StopOutcome::Recorded(log))
            }
            SessionState::Playing => {
                if let Some(playback) = &self.playback {
                    playback.stop.stop();
                }
                tracing::info!("playback stop requested");
                Ok(StopOutcome::PlaybackStopping)
            }
        }
    }

    /// Replay the current log on a background thread
    pub fn play(&mut self) -> Result<()> {
        self.ensure_idle()?;
        if self.log.is_empty() {
            tracing::warn!("play rejected: {}", Rejection::EmptyLog);
            return Err(Rejection::EmptyLog.into());
        }

        let (stop, mut signal) = stop_channel();
        let replayer = Replayer::new(
            Arc::clone(&self.log),
            Arc::clone(&self.injector),
            Arc::clone(&self.clock),
        )
        .with_options(self.options)
        .with_notices(self.notice_tx.clone());

        let state = Arc::clone(&self.state);
        let notices = self.notice_tx.clone();
        let events = self.log.count();

        *self.state.lock() = SessionState::Playing;
        self.notify(SessionNotice::PlaybackStarted { events });

        let spawned = std::thread::Builder::new()
            .name("macro-replay".to_string())
            .spawn(move || {
                let report = replayer.run(&mut signal);
                *state.lock() = SessionState::Idle;
                if notices.send(SessionNotice::PlaybackFinished(report)).is_err() {
                    tracing::debug!("notice receiver gone");
                }
                report
            });

        match spawned {
            Ok(thread) => {
                self.playback = Some(Playback { stop, thread });
                tracing::info!(events, "playback started");
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = SessionState::Idle;
                Err(MacroError::Io(e).with_context("Failed to spawn replay thread"))
            }
        }
    }

    /// Wait for the current replay to end and return its report
    ///
    /// Returns `None` if no replay was started since the last join.
    pub fn join_playback(&mut self) -> Option<ReplayReport> {
        let playback = self.playback.take()?;
        match playback.thread.join() {
            Ok(report) => Some(report),
            Err(_) => {
                tracing::error!("replay thread panicked");
                *self.state.lock() = SessionState::Idle;
                None
            }
        }
    }

    /// Stop everything and refuse further commands
    ///
    /// An active capture is discarded; an active replay is cancelled and
    /// waited for. Safe to call more than once.
    pub fn quit(&mut self) {
        if self.shut_down {
            return;
        }
        match self.state() {
            SessionState::Recording => {
                let discarded = self.capturer.stop(self.observer.as_mut());
                tracing::info!(events = discarded.count(), "recording discarded");
                *self.state.lock() = SessionState::Idle;
            }
            SessionState::Playing => {
                if let Some(playback) = &self.playback {
                    playback.stop.stop();
                }
            }
            SessionState::Idle => {}
        }
        self.join_playback();
        self.shut_down = true;
        tracing::debug!("session shut down");
    }

    /// Whether [`quit`](Self::quit) has been called
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn ensure_idle(&mut self) -> Result<()> {
        if self.shut_down {
            return Err(Rejection::ShutDown.into());
        }
        self.reap_playback();
        let rejection = match self.state() {
            SessionState::Idle => return Ok(()),
            SessionState::Recording => Rejection::RecordingActive,
            SessionState::Playing => Rejection::PlaybackActive,
        };
        tracing::warn!(state = %self.state(), "command rejected: {}", rejection);
        Err(rejection.into())
    }

    /// Join a replay thread that has already finished
    fn reap_playback(&mut self) {
        if self
            .playback
            .as_ref()
            .is_some_and(|p| p.thread.is_finished())
        {
            self.join_playback();
        }
    }

    fn notify(&self, notice: SessionNotice) {
        if self.notice_tx.send(notice).is_err() {
            tracing::debug!("notice receiver gone");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.quit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ManualClock, RecordingInjector, VirtualObserver};
    use crate::session::player::PROGRESS_BACKLOG;
    use crate::keys::{Key, KeyRepr};
    use crate::types::Event;
    use std::time::Duration;

    fn controller() -> (SessionController, VirtualObserver, RecordingInjector) {
        let observer = VirtualObserver::new();
        let injector = RecordingInjector::new();
        let controller = SessionController::with_clock(
            observer.clone(),
            injector.clone(),
            Arc::new(ManualClock::new()),
        );
        (controller, observer, injector)
    }

    fn short_log() -> EventLog {
        EventLog::from_events(
            chrono::Local::now().naive_local(),
            vec![
                Event::pointer_move(0.0, 1, 2),
                Event::key(0.0, KeyRepr::Char('x'), true),
            ],
        )
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (mut controller, _, _) = controller();
        assert!(matches!(controller.stop().unwrap(), StopOutcome::Idle));
        assert!(matches!(controller.stop().unwrap(), StopOutcome::Idle));
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn test_record_then_stop() {
        let (mut controller, observer, _) = controller();
        controller.start().unwrap();
        assert_eq!(controller.state(), SessionState::Recording);

        observer.emit_key(Key::Char('q'), true);
        let StopOutcome::Recorded(log) = controller.stop().unwrap() else {
            panic!("expected a recorded log");
        };
        assert_eq!(log.count(), 1);
        assert_eq!(controller.log().count(), 1);
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(
            controller.drain_notices(),
            vec![
                SessionNotice::RecordingStarted,
                SessionNotice::RecordingStopped { events: 1 },
            ]
        );
    }

    #[test]
    fn test_illegal_transitions_are_rejected() {
        let (mut controller, _, _) = controller();
        controller.start().unwrap();

        let err = controller.start().unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::AlreadyRecording));

        let err = controller.play().unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::RecordingActive));
        assert_eq!(controller.state(), SessionState::Recording);

        let err = controller.load(short_log()).unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::RecordingActive));
    }

    #[test]
    fn test_play_empty_log_is_rejected() {
        let (mut controller, _, _) = controller();
        let err = controller.play().unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::EmptyLog));
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn test_hook_failure_leaves_idle() {
        let (mut controller, observer, _) = controller();
        observer.fail_registration("denied");
        let err = controller.start().unwrap_err();
        assert!(matches!(err, MacroError::HookRegistration(_)));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.drain_notices().is_empty());
    }

    #[test]
    fn test_play_to_completion() {
        let (mut controller, _, injector) = controller();
        controller.load(short_log()).unwrap();
        controller.play().unwrap();

        let report = controller.join_playback().unwrap();
        assert_eq!(report.dispatched, 2);
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(injector.call_count(), 2);

        let notices = controller.drain_notices();
        assert_eq!(notices.first(), Some(&SessionNotice::PlaybackStarted { events: 2 }));
        assert_eq!(notices.last(), Some(&SessionNotice::PlaybackFinished(report)));
    }

    #[test]
    fn test_finished_notice_survives_progress_backlog() {
        let (mut controller, _, injector) = controller();
        let events = (0..PROGRESS_BACKLOG + 904)
            .map(|i| Event::pointer_move(0.0, i as i32, 0))
            .collect();
        controller
            .load(EventLog::from_events(chrono::Local::now().naive_local(), events))
            .unwrap();
        controller.play().unwrap();
        let report = controller.join_playback().unwrap();
        assert_eq!(report.dispatched, PROGRESS_BACKLOG + 904);
        assert_eq!(injector.call_count(), PROGRESS_BACKLOG + 904);

        let notices = controller.drain_notices();
        assert!(notices.len() <= PROGRESS_BACKLOG + 1);
        assert_eq!(
            notices.first(),
            Some(&SessionNotice::PlaybackStarted {
                events: PROGRESS_BACKLOG + 904
            })
        );
        assert_eq!(notices.last(), Some(&SessionNotice::PlaybackFinished(report)));
    }

    #[test]
    fn test_start_rejected_while_playing() {
        let (mut controller, _, _) = controller();
        let log = EventLog::from_events(
            chrono::Local::now().naive_local(),
            vec![Event::pointer_move(30.0, 0, 0)],
        );
        controller.load(log).unwrap();
        controller.play().unwrap();

        let err = controller.start().unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::PlaybackActive));

        assert!(matches!(
            controller.stop().unwrap(),
            StopOutcome::PlaybackStopping
        ));
        let report = controller.join_playback().unwrap();
        assert!(report.cancelled);
        assert_eq!(report.dispatched, 0);
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn test_quit_discards_capture_and_rejects_later_commands() {
        let (mut controller, observer, _) = controller();
        controller.start().unwrap();
        observer.emit_move(1.0, 1.0);

        controller.quit();
        assert!(controller.is_shut_down());
        assert!(!observer.is_registered());
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(controller.log().count(), 0);

        let err = controller.start().unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::ShutDown));
    }

    #[test]
    fn test_quit_cancels_playback() {
        let (mut controller, _, injector) = controller();
        let log = EventLog::from_events(
            chrono::Local::now().naive_local(),
            vec![
                Event::pointer_move(0.0, 0, 0),
                Event::pointer_move(60.0, 1, 1),
            ],
        );
        controller.load(log).unwrap();
        controller.play().unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while injector.call_count() == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        let started = std::time::Instant::now();
        controller.quit();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(injector.call_count(), 1);
        assert_eq!(controller.state(), SessionState::Idle);
    }
}
