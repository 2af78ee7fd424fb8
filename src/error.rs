// src/error.rs
//! Error types shared by the capture engine and the card converter

use std::path::PathBuf;

use thiserror::Error;

/// Failure to read the watched clipboard buffer.
///
/// These are transient from the capture loop's point of view: it logs the
/// failure and polls again on the next tick.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("failed to launch clipboard reader `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("clipboard reader exited with {code:?}: {stderr}")]
    Status { code: Option<i32>, stderr: String },

    #[error("clipboard content is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while capturing and writing records.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("output write failed")]
    Io(#[from] std::io::Error),

    #[error("record serialization failed")]
    Serialize(#[from] serde_json::Error),

    #[error("output stream already finalized")]
    StreamFinalized,

    #[error("capture loop terminated unexpectedly: {0}")]
    LoopPanicked(String),
}

/// Errors raised by the card converter.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("missing file {}", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid capture file", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
