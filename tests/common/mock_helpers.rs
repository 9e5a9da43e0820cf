//! Controller construction helpers

use std::sync::Arc;

use macro_recorder::input::{ManualClock, RecordingInjector, SystemClock, VirtualObserver};
use macro_recorder::SessionController;

/// A controller wired to virtual devices, plus handles to those devices
pub struct TestSession {
    pub controller: SessionController,
    pub observer: VirtualObserver,
    pub injector: RecordingInjector,
}

/// Controller on the system clock
pub fn create_test_session() -> TestSession {
    let observer = VirtualObserver::new();
    let injector = RecordingInjector::new();
    let controller = SessionController::with_clock(
        observer.clone(),
        injector.clone(),
        Arc::new(SystemClock::new()),
    );
    TestSession {
        controller,
        observer,
        injector,
    }
}

/// Controller on a manual clock, for deterministic capture timestamps
pub fn create_manual_session() -> (TestSession, Arc<ManualClock>) {
    let observer = VirtualObserver::new();
    let injector = RecordingInjector::new();
    let clock = Arc::new(ManualClock::new());
    let controller =
        SessionController::with_clock(observer.clone(), injector.clone(), clock.clone());
    (
        TestSession {
            controller,
            observer,
            injector,
        },
        clock,
    )
}
