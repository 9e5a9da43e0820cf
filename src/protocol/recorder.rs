//! Headless recorder loop

use std::io::{BufRead, Write};

use crate::error::{Result, ResultExt};
use crate::session::{exchange, SessionController, StopOutcome};

use super::{Command, SharedWriter, RECORDING_STARTED, RECORDING_STOPPED};

/// Serve recorder commands from `input` until `QUIT` or end of input
///
/// An active capture is discarded on exit.
pub fn run_recorder<R: BufRead, W: Write>(
    controller: &mut SessionController,
    input: R,
    output: W,
) -> Result<()> {
    let writer = SharedWriter::new(output);
    tracing::info!("recorder ready");

    for line in input.lines() {
        let line = line.context("Failed to read command")?;
        let Some(command) = Command::parse(&line) else {
            tracing::debug!(line = line.trim(), "ignoring unknown line");
            continue;
        };

        match command {
            Command::Start => match controller.start() {
                Ok(()) => writer.line(RECORDING_STARTED)?,
                Err(e) if e.is_rejection() => tracing::debug!("START ignored: {}", e),
                Err(e) => {
                    tracing::error!("Failed to start recording: {}", e);
                    writer.error(&e.to_string())?;
                }
            },
            Command::Stop => {
                if let StopOutcome::Recorded(log) = controller.stop()? {
                    let json = exchange::to_json(&log)?;
                    writer.line(RECORDING_STOPPED)?;
                    writer.line(&json)?;
                }
            }
            Command::Quit => break,
            Command::Play(_) => tracing::debug!("PLAY is not a recorder command"),
        }
    }

    controller.quit();
    tracing::info!("recorder exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ManualClock, RecordingInjector, VirtualObserver};
    use std::io::Cursor;
    use std::sync::Arc;

    fn controller(observer: &VirtualObserver) -> SessionController {
        SessionController::with_clock(
            observer.clone(),
            RecordingInjector::new(),
            Arc::new(ManualClock::new()),
        )
    }

    fn run(controller: &mut SessionController, script: &str) -> Vec<String> {
        let mut out = Vec::new();
        run_recorder(controller, Cursor::new(script.to_string()), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_start_stop_without_input() {
        let observer = VirtualObserver::new();
        let mut controller = controller(&observer);
        let lines = run(&mut controller, "START\nSTART\nSTOP\nSTOP\nQUIT\n");

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], RECORDING_STARTED);
        assert_eq!(lines[1], RECORDING_STOPPED);
        let value: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(value["actions"], serde_json::json!([]));
        assert!(value["start_time"].is_string());
    }

    #[test]
    fn test_hook_failure_reports_error() {
        let observer = VirtualObserver::new();
        observer.fail_registration("permission denied");
        let mut controller = controller(&observer);
        let lines = run(&mut controller, "START\n");

        assert_eq!(
            lines,
            vec!["ERROR: Hook registration failed: permission denied".to_string()]
        );
    }

    #[test]
    fn test_unknown_lines_are_ignored() {
        let observer = VirtualObserver::new();
        let mut controller = controller(&observer);
        let lines = run(&mut controller, "\nhello\nPLAY:{}\n  \n");
        assert!(lines.is_empty());
        assert!(controller.is_shut_down());
    }
}
