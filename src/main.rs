// src/main.rs
//! Clipboard capture tool
//!
//! Watches the clipboard and logs each copied text, tagged with the
//! current source/tag/note, into a timestamped JSON file in the working
//! directory. Metadata is set from an interactive prompt.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use clipboard_capture::core::buffer::reader_for;
use clipboard_capture::core::commands::{CommandSession, SessionEnd};
use clipboard_capture::core::output::FileSink;
use clipboard_capture::{CaptureConfig, CaptureSession, ReaderKind};

/// Command line interface for the clipboard capture tool
///
/// Every option has a default, so running with no arguments starts a
/// capture session right away.
#[derive(Debug, Parser)]
#[command(
    name = "clip-capture",
    about = "Log copied text with source/tag/note metadata to a JSON file",
    long_about = "Watches the clipboard and, on each change, writes the previously copied text plus the current source, tag and note as one record of a JSON array. Use the interactive commands to set metadata; `quit` closes the file."
)]
struct Args {
    /// Clipboard poll interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Directory for the timestamped capture file (default: current directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write to this file instead of a timestamped one
    #[arg(long, conflicts_with = "output_dir")]
    output_file: Option<PathBuf>,

    /// Capture copied URLs too instead of ignoring them
    #[arg(long)]
    no_url_filter: bool,

    /// Clipboard reader backend
    #[arg(long, default_value = "auto", value_enum)]
    reader: ReaderKind,

    /// Verbosity level for logging (logs go to stderr)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            poll_interval: Duration::from_millis(self.interval_ms.max(1)),
            output_dir: self.output_dir.clone(),
            output_file: self.output_file.clone(),
            url_filter: !self.no_url_filter,
            reader: self.reader,
            ..CaptureConfig::default()
        }
    }
}

/// Set up logging based on verbosity level
///
/// Logs go to stderr so they never mix with the prompt on stdout.
fn setup_logging(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .with_thread_ids(verbose > 2)
        .init();
}

/// Forward Ctrl-C to the command session so it can close the file.
fn spawn_interrupt_watch() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                debug!("interrupt received");
                let _ = tx.send(true);
            }
            Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });
    rx
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);
    debug!("Configuration: {:#?}", args);

    let config = args.capture_config();
    let output_path = config
        .output_path(chrono::Local::now())
        .context("Failed to determine the capture file path")?;
    let reader = reader_for(config.reader).context("Failed to set up the clipboard reader")?;

    println!("Logging to {}", output_path.display());
    info!("🚀 clip-capture v{}", env!("CARGO_PKG_VERSION"));

    let mut session = CaptureSession::start(
        &config,
        Arc::from(reader),
        Box::new(FileSink::new(&output_path)),
    )
    .with_context(|| format!("Failed to start capture into {}", output_path.display()))?;

    let stdin = BufReader::new(tokio::io::stdin());
    let end = CommandSession::new(&mut session, stdin, std::io::stdout())
        .with_interrupt(spawn_interrupt_watch())
        .run()
        .await
        .context("Capture session failed")?;
    debug!(?end, "session finished");

    println!("Logged to {}", output_path.display());

    // A stdin read may still be parked on the blocking pool after Ctrl-C;
    // dropping the runtime would wait for it.
    if end == SessionEnd::Interrupted {
        std::process::exit(0);
    }
    Ok(())
}
