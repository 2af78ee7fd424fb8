// src/core/buffer.rs
//! Clipboard readers
//!
//! A [`BufferReader`] answers one question: what text is on the clipboard
//! right now. It holds no state between calls; change detection lives in
//! the capture loop.

use std::collections::VecDeque;
use std::process::Command;
use std::sync::Mutex;

use tracing::trace;

use crate::config::ReaderKind;
use crate::error::BufferError;

/// Reads the current text content of the watched buffer.
pub trait BufferReader: Send + Sync {
    fn read(&self) -> Result<String, BufferError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Reads the general pasteboard through AppKit.
#[cfg(target_os = "macos")]
#[derive(Debug, Default, Clone, Copy)]
pub struct PasteboardReader;

#[cfg(target_os = "macos")]
impl BufferReader for PasteboardReader {
    fn read(&self) -> Result<String, BufferError> {
        use objc2_app_kit::NSPasteboard;
        use objc2_foundation::NSString;

        // Called from blocking worker threads, which have no pool of their own.
        objc2::rc::autoreleasepool(|_| {
            #[allow(unused_unsafe)]
            let text = unsafe {
                let pasteboard = NSPasteboard::generalPasteboard();
                pasteboard.stringForType(&NSString::from_str("public.utf8-plain-text"))
            };
            // Non-text clipboard content reads as empty.
            Ok(text.map(|s| s.to_string()).unwrap_or_default())
        })
    }

    fn name(&self) -> &'static str {
        "pasteboard"
    }
}

/// Shells out to `pbpaste` (or a compatible program) and returns its stdout.
#[derive(Debug, Clone)]
pub struct PbpasteReader {
    program: String,
}

impl PbpasteReader {
    pub fn new() -> Self {
        Self::with_program("pbpaste")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PbpasteReader {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferReader for PbpasteReader {
    fn read(&self) -> Result<String, BufferError> {
        let output = Command::new(&self.program)
            .output()
            .map_err(|source| BufferError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BufferError::Status {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8(output.stdout)?;
        trace!(program = %self.program, chars = text.chars().count(), "clipboard read");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "pbpaste"
    }
}

/// Reader that replays a fixed sequence of reads, for tests and dry runs.
///
/// `None` entries simulate a failed read. Once the script is exhausted the
/// last successful value is returned forever.
#[derive(Debug, Default)]
pub struct ScriptedReader {
    script: Mutex<VecDeque<Option<String>>>,
    last: Mutex<String>,
}

impl ScriptedReader {
    pub fn new<I, S>(reads: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(reads.into_iter().map(|r| r.map(Into::into)).collect()),
            last: Mutex::new(String::new()),
        }
    }

    /// Queue another read at the end of the script.
    pub fn push(&self, read: Option<&str>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(read.map(str::to_string));
        }
    }
}

impl BufferReader for ScriptedReader {
    fn read(&self) -> Result<String, BufferError> {
        let next = self
            .script
            .lock()
            .map_err(|_| BufferError::Unavailable("script lock poisoned".into()))?
            .pop_front();
        let mut last = self
            .last
            .lock()
            .map_err(|_| BufferError::Unavailable("script lock poisoned".into()))?;
        match next {
            Some(Some(value)) => {
                *last = value.clone();
                Ok(value)
            }
            Some(None) => Err(BufferError::Unavailable("scripted failure".into())),
            None => Ok(last.clone()),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Build the reader selected by configuration.
pub fn reader_for(kind: ReaderKind) -> Result<Box<dyn BufferReader>, BufferError> {
    match kind {
        #[cfg(target_os = "macos")]
        ReaderKind::Auto | ReaderKind::Pasteboard => Ok(Box::new(PasteboardReader)),
        #[cfg(not(target_os = "macos"))]
        ReaderKind::Auto => Ok(Box::new(PbpasteReader::new())),
        #[cfg(not(target_os = "macos"))]
        ReaderKind::Pasteboard => Err(BufferError::Unavailable(
            "NSPasteboard is only available on macOS".into(),
        )),
        ReaderKind::Pbpaste => Ok(Box::new(PbpasteReader::new())),
    }
}
