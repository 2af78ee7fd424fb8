// src/core/output.rs
//! Append-only output for capture records
//!
//! The capture file is a JSON array produced one record at a time:
//!
//! ```text
//! [
//! { ...first record... }
//! ,
//! { ...second record... }
//! ]
//! ```
//!
//! [`FileSink`] opens, appends and closes the file on every write instead
//! of holding a handle, so everything up to the last completed record is
//! on disk if the process dies. [`JsonArrayWriter`] tracks the separator
//! and finalization state on top of any [`OutputSink`].

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::core::record::Record;
use crate::error::CaptureError;

/// Destination for output lines.
pub trait OutputSink: Send {
    /// Append `text` followed by a newline.
    fn write_line(&mut self, text: &str) -> io::Result<()>;

    /// Human-readable destination name for logs and banners.
    fn describe(&self) -> String;
}

/// File sink that reopens the file in append mode for every write.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for FileSink {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", text)?;
        trace!(path = %self.path.display(), bytes = text.len() + 1, "appended");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory sink; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    buffer: Arc<Mutex<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        match self.buffer.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl OutputSink for MemorySink {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        let mut buf = self
            .buffer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink poisoned"))?;
        buf.push_str(text);
        buf.push('\n');
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

impl OutputSink for Box<dyn OutputSink> {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        (**self).write_line(text)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Incremental writer for a JSON array of [`Record`]s.
pub struct JsonArrayWriter<S: OutputSink> {
    sink: S,
    opened: bool,
    records_written: usize,
    finalized: bool,
}

impl<S: OutputSink> JsonArrayWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            opened: false,
            records_written: 0,
            finalized: false,
        }
    }

    /// Write the opening bracket. Later calls are no-ops.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        if self.finalized {
            return Err(CaptureError::StreamFinalized);
        }
        if !self.opened {
            self.sink.write_line("[")?;
            self.opened = true;
            debug!(sink = %self.sink.describe(), "json array opened");
        }
        Ok(())
    }

    /// Append one record, preceded by a separator unless it is the first.
    pub fn write_record(&mut self, record: &Record) -> Result<(), CaptureError> {
        if self.finalized {
            return Err(CaptureError::StreamFinalized);
        }
        self.open()?;
        let json = record.to_pretty_json()?;
        // Separator and record go out in one append.
        let chunk = if self.records_written > 0 {
            format!(",\n{}", json)
        } else {
            json
        };
        self.sink.write_line(&chunk)?;
        self.records_written += 1;
        debug!(records = self.records_written, "record written");
        Ok(())
    }

    /// Write the closing bracket.
    ///
    /// Returns `Ok(true)` when this call closed the array and `Ok(false)`
    /// when it was already closed.
    pub fn close(&mut self) -> Result<bool, CaptureError> {
        if self.finalized {
            return Ok(false);
        }
        if !self.opened {
            self.sink.write_line("[")?;
            self.opened = true;
        }
        self.sink.write_line("]")?;
        self.finalized = true;
        debug!(records = self.records_written, "json array closed");
        Ok(true)
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
