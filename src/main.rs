//! Macro Recorder - Main Entry Point
//!
//! Interactive record/play commands, the headless line-protocol recorder and
//! player, and recording library management.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{select, Receiver};
use macro_recorder::{
    config::{self, AppConfig, LoggingSettings},
    input::LoggingInjector,
    protocol,
    session::{exchange, RecordingLibrary},
    Repeat, SessionController, SessionNotice, StopOutcome,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default log filter when neither `RUST_LOG` nor the config sets one
const DEFAULT_LOG_FILTER: &str = "info,macro_recorder=debug";

/// Record and replay mouse and keyboard input
#[derive(Parser, Debug)]
#[command(name = "macro-recorder")]
#[command(about = "Record and replay mouse and keyboard input")]
#[command(version)]
struct Args {
    /// Config file (defaults to config.toml in the app data directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record input until Enter is pressed (or stdin closes)
    Record {
        /// Save into the library under this name
        #[arg(short, long)]
        name: Option<String>,

        /// Save to this file instead of the library
        #[arg(short, long, conflicts_with = "name")]
        output: Option<PathBuf>,
    },

    /// Replay a recording; Enter stops it
    Play {
        /// Recording file to play
        file: Option<PathBuf>,

        /// Library recording to play
        #[arg(short, long, conflicts_with = "file")]
        name: Option<String>,

        /// Number of passes
        #[arg(short, long)]
        repeat: Option<u32>,

        /// Repeat until stopped
        #[arg(long, conflicts_with = "repeat")]
        forever: bool,

        /// Speed multiplier (0.1 - 10.0)
        #[arg(short, long)]
        speed: Option<f64>,

        /// Log injections instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Line-protocol recorder on stdin/stdout
    Recorder,

    /// Line-protocol player on stdin/stdout
    Player {
        /// Log injections instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// List library recordings, newest first
    List,

    /// Delete a library recording
    Delete {
        /// Recording name
        name: String,
    },

    /// Rename a library recording
    Rename {
        /// Current name
        old: String,
        /// New name
        new: String,
    },

    /// Write a config file with the default settings
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let (config, config_error) = match config {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = init_logging(&config.logging)?;
    if let Some(e) = config_error {
        tracing::warn!("Failed to load config, using defaults: {}", e);
    }

    let library = RecordingLibrary::new(config.library_dir());

    match args.command {
        Command::Record { name, output } => record(&library, name, output),
        Command::Play {
            file,
            name,
            repeat,
            forever,
            speed,
            dry_run,
        } => {
            let log = match (file, name) {
                (Some(file), _) => exchange::load_from_file(&file)?,
                (None, Some(name)) => library.load(&name)?,
                (None, None) => bail!("give a recording file or --name"),
            };

            let mut options = config.playback.to_options();
            if let Some(speed) = speed {
                options = options.with_speed(speed);
            }
            if forever {
                options = options.with_repeat(Repeat::Forever);
            } else if let Some(count) = repeat {
                options = options.with_repeat(Repeat::Times(count));
            }

            let mut session = new_session(dry_run).with_options(options);
            session.load(log)?;
            play(&mut session)
        }
        Command::Recorder => {
            let mut session = new_session(false);
            let stdin = std::io::stdin();
            protocol::run_recorder(&mut session, stdin.lock(), std::io::stdout())?;
            Ok(())
        }
        Command::Player { dry_run } => {
            let mut session = new_session(dry_run).with_options(config.playback.to_options());
            let stdin = std::io::stdin();
            protocol::run_player(&mut session, stdin.lock(), std::io::stdout())?;
            Ok(())
        }
        Command::List => {
            let recordings = library.list()?;
            if recordings.is_empty() {
                println!("No recordings in {}", library.dir().display());
            }
            for r in recordings {
                println!(
                    "{:<24} {:>6} events {:>9.2}s  {}",
                    r.name,
                    r.events,
                    r.duration,
                    r.modified.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(())
        }
        Command::Delete { name } => {
            library.delete(&name)?;
            println!("Deleted {}", name);
            Ok(())
        }
        Command::Rename { old, new } => {
            library.rename(&old, &new)?;
            println!("Renamed {} to {}", old, new);
            Ok(())
        }
        Command::InitConfig { force } => {
            let path = match args.config {
                Some(path) => path,
                None => config::config_path().context("Could not determine config file path")?,
            };
            AppConfig::init_at(&path, force)
                .context("Config not written (use --force to overwrite)")?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

/// Install stderr logging, plus a daily-rolling file when configured
///
/// stdout is reserved for protocol replies.
fn init_logging(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(settings.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    })?;
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let Some(file) = &settings.file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    let dir = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = file
        .file_name()
        .context("logging.file has no file name")?;
    let appender = tracing_appender::rolling::daily(dir, prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
    Ok(Some(guard))
}

#[cfg(feature = "native-input")]
fn new_session(dry_run: bool) -> SessionController {
    use macro_recorder::input::{NativeInjector, NativeObserver};

    if dry_run {
        SessionController::new(NativeObserver::new(), LoggingInjector)
    } else {
        SessionController::new(NativeObserver::new(), NativeInjector::new())
    }
}

#[cfg(not(feature = "native-input"))]
fn new_session(dry_run: bool) -> SessionController {
    use macro_recorder::input::UnavailableObserver;

    if !dry_run {
        tracing::warn!("Built without the `native-input` feature; playback is a dry run");
    }
    SessionController::new(UnavailableObserver::new(), LoggingInjector)
}

/// Forward stdin lines to a channel so waits can also watch other events
fn stdin_lines() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("stdin-watcher".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        })
        .ok();
    rx
}

fn record(library: &RecordingLibrary, name: Option<String>, output: Option<PathBuf>) -> Result<()> {
    let mut session = new_session(true);
    session.start().context("Failed to start recording")?;
    eprintln!("Recording... press Enter to stop.");

    // With stdin already closed there is no Enter to wait for
    if stdin_lines().recv().is_err() {
        tracing::warn!("stdin closed before Enter; stopping capture");
    }

    let StopOutcome::Recorded(log) = session.stop()? else {
        bail!("recording was not active");
    };
    println!("Captured {} events over {:.2}s", log.count(), log.duration());

    let path = match output {
        Some(path) => {
            exchange::save_to_file(&log, &path)?;
            path
        }
        None => {
            let name = name.unwrap_or_else(|| {
                chrono::Local::now()
                    .format("recording-%Y%m%d-%H%M%S")
                    .to_string()
            });
            library.save(&name, &log)?
        }
    };
    println!("Saved to {}", path.display());
    Ok(())
}

fn play(session: &mut SessionController) -> Result<()> {
    let notices = session.notices();
    let log = session.log();
    eprintln!(
        "Playing {} events ({:.2}s); press Enter to stop.",
        log.count(),
        log.duration()
    );

    let mut enter = stdin_lines();
    session.play()?;

    loop {
        select! {
            recv(notices) -> notice => match notice {
                Ok(SessionNotice::PlaybackFinished(_)) | Err(_) => break,
                Ok(_) => {}
            },
            recv(enter) -> line => {
                if line.is_ok() {
                    session.stop()?;
                } else {
                    enter = crossbeam_channel::never();
                }
            }
        }
    }

    if let Some(report) = session.join_playback() {
        println!(
            "{} {} events in {} pass(es){}",
            if report.cancelled { "Stopped after" } else { "Replayed" },
            report.dispatched,
            report.iterations,
            if report.skipped > 0 {
                format!(", {} skipped", report.skipped)
            } else {
                String::new()
            }
        );
    }
    Ok(())
}
