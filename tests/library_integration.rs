//! Integration tests for the recording library and config wiring

mod common;

use common::builders::{reference_session, LogBuilder};
use common::mock_helpers::create_test_session;
use macro_recorder::config::AppConfig;
use macro_recorder::{MacroError, RecordingLibrary};

#[test]
fn test_library_recording_replays() {
    let dir = tempfile::tempdir().unwrap();
    let library = RecordingLibrary::new(dir.path());
    let log = LogBuilder::new()
        .moves_to(0.0, 100, 200)
        .presses(0.0, "Key.f5")
        .releases(0.0, "Key.f5")
        .build();
    library.save("refresh", &log).unwrap();

    let mut session = create_test_session();
    session
        .controller
        .load(library.load("refresh").unwrap())
        .unwrap();
    session.controller.play().unwrap();
    let report = session.controller.join_playback().unwrap();

    assert_eq!(report.dispatched, 3);
    assert_eq!(report.skipped, 0);
}

#[test]
fn test_library_listing_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let library = RecordingLibrary::new(dir.path());
    library.save("reference", &reference_session()).unwrap();

    let listed = library.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "reference");
    assert_eq!(listed[0].events, 3);
    common::assert_float_eq(listed[0].duration, 1.05, 1e-9);
}

#[test]
fn test_rejects_names_outside_library() {
    let dir = tempfile::tempdir().unwrap();
    let library = RecordingLibrary::new(dir.path());
    let err = library.save("../outside", &reference_session()).unwrap_err();
    assert!(matches!(err, MacroError::Library(_)));
    assert!(!dir.path().join("../outside.json").exists());
}

#[test]
fn test_config_library_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let target = dir.path().join("macros");
    std::fs::write(
        &path,
        format!("[library]\ndirectory = {:?}\n", target.display().to_string()),
    )
    .unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.library_dir(), target);

    let library = RecordingLibrary::new(config.library_dir());
    library.save("x", &reference_session()).unwrap();
    assert!(target.join("x.json").is_file());
}
