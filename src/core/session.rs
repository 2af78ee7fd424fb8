// src/core/session.rs
//! Session controller
//!
//! Everything the capture loop and the command session share (metadata,
//! the pending item and the JSON writer) sits behind one mutex in
//! [`SessionState`]. The loop and the command session each hold a
//! [`SessionHandle`]; only [`CaptureSession`] can start and stop the loop.
//!
//! Shutdown order: lock → finalize pending → close array → unlock → stop
//! loop. Once the array is closed the loop's next capture attempt fails
//! with [`CaptureError::StreamFinalized`] and the loop exits on its own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CaptureConfig;
use crate::core::buffer::BufferReader;
use crate::core::capture_loop::{CaptureLoop, Notice};
use crate::core::output::{JsonArrayWriter, OutputSink};
use crate::core::record::{CapturedItem, Metadata, Record};
use crate::error::CaptureError;

struct SessionState {
    metadata: Metadata,
    pending: Option<CapturedItem>,
    output: JsonArrayWriter<Box<dyn OutputSink>>,
}

impl SessionState {
    /// Write the pending item, if it has any content, and consume the note.
    fn finalize_pending(&mut self) -> Result<Option<Record>, CaptureError> {
        let item = match self.pending.take() {
            Some(item) if !item.is_blank() => item,
            Some(_) => {
                debug!("dropping blank clipboard item");
                return Ok(None);
            }
            None => return Ok(None),
        };

        let record = Record::build(&self.metadata, Some(&item));
        self.output.write_record(&record)?;
        self.metadata.note.clear();
        Ok(Some(record))
    }
}

/// Cloneable access to the shared capture state.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    /// Wrap a writer whose array has already been opened (or will be lazily).
    pub fn new(output: JsonArrayWriter<Box<dyn OutputSink>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                metadata: Metadata::default(),
                pending: None,
                output,
            })),
        }
    }

    // The state is plain data, so a panic elsewhere must not stop the
    // array from being closed.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_source(&self, source: impl Into<String>) {
        self.lock().metadata.source = source.into();
    }

    pub fn set_tag(&self, tag: impl Into<String>) {
        self.lock().metadata.tag = tag.into();
    }

    pub fn set_note(&self, note: impl Into<String>) {
        self.lock().metadata.note = note.into();
    }

    /// Flip extract tagging and return the new value.
    pub fn toggle_extract(&self) -> bool {
        let mut state = self.lock();
        state.metadata.is_extract = !state.metadata.is_extract;
        state.metadata.is_extract
    }

    pub fn metadata(&self) -> Metadata {
        self.lock().metadata.clone()
    }

    /// Record that would be written for the pending item right now.
    pub fn snapshot(&self) -> Record {
        let state = self.lock();
        Record::build(&state.metadata, state.pending.as_ref())
    }

    pub fn pending(&self) -> Option<CapturedItem> {
        self.lock().pending.clone()
    }

    /// Finalize the pending item and adopt `content` as the new one.
    ///
    /// The new content is adopted even if writing the old item fails.
    pub fn capture(&self, content: String) -> Result<Option<Record>, CaptureError> {
        let mut state = self.lock();
        if state.output.is_finalized() {
            return Err(CaptureError::StreamFinalized);
        }
        let written = state.finalize_pending();
        state.pending = Some(CapturedItem::new(content));
        written
    }

    /// Finalize the pending item without adopting a new one.
    pub fn finalize_pending(&self) -> Result<Option<Record>, CaptureError> {
        let mut state = self.lock();
        if state.output.is_finalized() {
            return Ok(None);
        }
        state.finalize_pending()
    }

    /// Flush the pending item and close the JSON array, under one lock.
    ///
    /// The closing bracket is written even when the flush fails. Returns
    /// `Ok(false)` if the array was already closed.
    pub fn close(&self) -> Result<bool, CaptureError> {
        let mut state = self.lock();
        if state.output.is_finalized() {
            return Ok(false);
        }
        let flushed = state.finalize_pending();
        if let Err(e) = &flushed {
            error!(error = %e, "failed to write last clipboard item");
        }
        let closed = state.output.close()?;
        flushed.map(|_| closed)
    }

    pub fn records_written(&self) -> usize {
        self.lock().output.records_written()
    }

    pub fn is_finalized(&self) -> bool {
        self.lock().output.is_finalized()
    }

    pub fn describe_output(&self) -> String {
        self.lock().output.sink().describe()
    }
}

/// Owner of a running capture: shared state plus the background loop.
pub struct CaptureSession {
    handle: SessionHandle,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    notices: Option<mpsc::UnboundedReceiver<Notice>>,
    shut_down: bool,
}

impl CaptureSession {
    /// Open the JSON array on `sink` and start polling `reader`.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn start(
        config: &CaptureConfig,
        reader: Arc<dyn BufferReader>,
        sink: Box<dyn OutputSink>,
    ) -> Result<Self, CaptureError> {
        let mut output = JsonArrayWriter::new(sink);
        output.open()?;
        let handle = SessionHandle::new(output);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        info!(
            reader = reader.name(),
            interval_ms = config.poll_interval.as_millis() as u64,
            output = %handle.describe_output(),
            "📋 capture started"
        );

        let capture = CaptureLoop::new(handle.clone(), reader, config, notice_tx);
        let task = tokio::spawn(capture.run(shutdown_rx));

        Ok(Self {
            handle,
            shutdown_tx,
            task: Some(task),
            notices: Some(notice_rx),
            shut_down: false,
        })
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Take the stream of loop notices. Only the first call gets it.
    pub fn take_notices(&mut self) -> Option<mpsc::UnboundedReceiver<Notice>> {
        self.notices.take()
    }

    /// True if the loop ended without a shutdown request.
    pub fn loop_stopped_unexpectedly(&self) -> bool {
        !self.shut_down && self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    pub fn set_source(&self, source: impl Into<String>) {
        self.handle.set_source(source);
    }

    pub fn set_tag(&self, tag: impl Into<String>) {
        self.handle.set_tag(tag);
    }

    pub fn set_note(&self, note: impl Into<String>) {
        self.handle.set_note(note);
    }

    pub fn toggle_extract(&self) -> bool {
        self.handle.toggle_extract()
    }

    pub fn snapshot(&self) -> Record {
        self.handle.snapshot()
    }

    /// Flush the pending item, close the array, then stop the loop.
    ///
    /// Safe to call more than once; later calls write nothing.
    pub async fn shutdown(&mut self) -> Result<(), CaptureError> {
        let closed = self.handle.close();
        self.shut_down = true;

        // The receiver may already be gone if the loop exited.
        let _ = self.shutdown_tx.send(true);
        let mut panicked = None;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!(error = %e, "capture loop had panicked before shutdown");
                    panicked = Some(CaptureError::LoopPanicked(e.to_string()));
                }
            }
        }

        match closed {
            Ok(true) => {
                info!(records = self.handle.records_written(), "🛑 capture stopped");
            }
            Ok(false) => debug!("shutdown called on a finalized session"),
            Err(e) => return Err(e),
        }
        match panicked {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if !self.shut_down {
            // Best effort: leave a well-formed file behind.
            if let Err(e) = self.handle.close() {
                error!(error = %e, "failed to close capture output on drop");
            }
            let _ = self.shutdown_tx.send(true);
            if let Some(task) = self.task.take() {
                task.abort();
            }
        }
    }
}
