//! Clipboard Capture Library
//!
//! This library watches the clipboard and logs every copied text, together
//! with user-entered source/tag/note metadata, as a JSON array that is
//! written one record at a time. A converter turns those files into
//! tab-delimited flashcard imports.

pub mod cards;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use crate::config::{CaptureConfig, ReaderKind};
pub use crate::core::record::{CapturedItem, Metadata, Record};
pub use crate::core::session::{CaptureSession, SessionHandle};
pub use crate::error::{BufferError, CaptureError, ConvertError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{CaptureConfig, ReaderKind};
    pub use crate::core::buffer::{reader_for, BufferReader, PbpasteReader, ScriptedReader};
    pub use crate::core::capture_loop::{ChangeDetector, Notice, Observation};
    pub use crate::core::commands::{CommandSession, SessionEnd};
    pub use crate::core::output::{FileSink, JsonArrayWriter, MemorySink, OutputSink};
    pub use crate::core::record::{CapturedItem, Metadata, Record};
    pub use crate::core::session::{CaptureSession, SessionHandle};
    pub use crate::error::{BufferError, CaptureError, ConvertError};
}
