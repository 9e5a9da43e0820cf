//! Headless player loop
//!
//! Replay runs on the controller's background thread, so replies about it
//! are written by a notice thread rather than the command loop. That keeps
//! `PLAYBACK_STARTED` / `PLAYBACK_STOPPED` in order even for replays that
//! finish before the loop reads its next line.

use std::io::{BufRead, Write};

use crossbeam_channel::{bounded, select, Receiver};

use crate::error::{Result, ResultExt};
use crate::session::{exchange, SessionController, SessionNotice};

use super::{Command, SharedWriter, PLAYBACK_STARTED, PLAYBACK_STOPPED};

/// How the command loop ended
#[derive(Debug, Clone, Copy)]
enum Exit {
    Quit,
    EndOfInput,
}

/// Serve player commands from `input` until `QUIT` or end of input
///
/// `QUIT` cancels an active replay. At end of input an active replay is
/// allowed to finish first.
pub fn run_player<R: BufRead, W: Write + Send>(
    controller: &mut SessionController,
    input: R,
    output: W,
) -> Result<()> {
    let writer = SharedWriter::new(output);
    let notices = controller.notices();
    let (done_tx, done_rx) = bounded::<()>(1);
    tracing::info!("player ready");

    std::thread::scope(|scope| {
        let notice_writer = writer.clone();
        scope.spawn(move || forward_notices(notices, done_rx, notice_writer));

        let exit = serve(controller, input, &writer);
        if matches!(exit, Ok(Exit::EndOfInput)) {
            if let Some(report) = controller.join_playback() {
                tracing::debug!(dispatched = report.dispatched, "replay drained at end of input");
            }
        }
        controller.quit();
        let _ = done_tx.send(());

        tracing::info!("player exiting");
        exit.map(|_| ())
    })
}

fn serve<R: BufRead, W: Write>(
    controller: &mut SessionController,
    input: R,
    writer: &SharedWriter<W>,
) -> Result<Exit> {
    for line in input.lines() {
        let line = line.context("Failed to read command")?;
        let Some(command) = Command::parse(&line) else {
            tracing::debug!(line = line.trim(), "ignoring unknown line");
            continue;
        };

        match command {
            Command::Play(json) => {
                let log = match exchange::from_json(&json) {
                    Ok(log) => log,
                    Err(e) => {
                        tracing::warn!("Rejected PLAY payload: {}", e);
                        writer.error("Invalid JSON")?;
                        continue;
                    }
                };
                if log.is_empty() {
                    tracing::debug!("PLAY with no actions ignored");
                    continue;
                }
                if let Err(e) = controller.load(log).and_then(|()| controller.play()) {
                    tracing::debug!("PLAY ignored: {}", e);
                }
            }
            Command::Stop => {
                controller.stop()?;
            }
            Command::Quit => return Ok(Exit::Quit),
            Command::Start => tracing::debug!("START is not a player command"),
        }
    }
    Ok(Exit::EndOfInput)
}

/// Turn replay notices into protocol replies until told to finish
fn forward_notices<W: Write>(
    notices: Receiver<SessionNotice>,
    done: Receiver<()>,
    writer: SharedWriter<W>,
) {
    let reply = |notice: SessionNotice| {
        let line = match notice {
            SessionNotice::PlaybackStarted { .. } => PLAYBACK_STARTED,
            SessionNotice::PlaybackFinished(_) => PLAYBACK_STOPPED,
            _ => return,
        };
        if let Err(e) = writer.line(line) {
            tracing::warn!("{}", e);
        }
    };

    loop {
        select! {
            recv(notices) -> notice => match notice {
                Ok(notice) => reply(notice),
                Err(_) => break,
            },
            recv(done) -> _ => {
                for notice in notices.try_iter() {
                    reply(notice);
                }
                break;
            }
        }
    }
}
