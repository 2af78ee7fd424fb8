// src/config.rs
//! Capture configuration

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};

/// Which clipboard reader to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReaderKind {
    /// NSPasteboard on macOS, `pbpaste` elsewhere
    #[default]
    Auto,
    /// AppKit general pasteboard (macOS only)
    Pasteboard,
    /// The `pbpaste` command
    Pbpaste,
}

/// Settings for one capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Time between clipboard reads
    pub poll_interval: Duration,

    /// Directory the capture file is created in (None = current directory)
    pub output_dir: Option<PathBuf>,

    /// Explicit capture file path; overrides the timestamped name
    pub output_file: Option<PathBuf>,

    /// Ignore copied URLs instead of capturing them
    pub url_filter: bool,

    /// Characters of copied text echoed back in the "copied" notice
    pub preview_chars: usize,

    pub reader: ReaderKind,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            output_dir: None,
            output_file: None,
            url_filter: true,
            preview_chars: 10,
            reader: ReaderKind::Auto,
        }
    }
}

impl CaptureConfig {
    /// Path of the capture file for a session started at `started`.
    pub fn output_path(&self, started: DateTime<Local>) -> std::io::Result<PathBuf> {
        if let Some(path) = &self.output_file {
            return Ok(path.clone());
        }
        let dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        Ok(dir.join(timestamped_filename(started)))
    }
}

/// `<YYYYmmdd_HHMMSS>.json`
pub fn timestamped_filename(at: DateTime<Local>) -> String {
    format!("{}.json", at.format("%Y%m%d_%H%M%S"))
}
