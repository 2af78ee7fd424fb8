// src/core/capture_loop.rs
//! Background clipboard polling
//!
//! The loop reads the clipboard once per tick and feeds the result to a
//! [`ChangeDetector`]. The first read is a baseline: whatever was on the
//! clipboard at startup is never captured. After that, every change that
//! is not a copied URL finalizes the previous item and becomes the new
//! pending item.
//!
//! Copied URLs only move the baseline. They are assumed to be the user
//! grabbing a page address for the `source` field.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use crate::config::CaptureConfig;
use crate::core::buffer::BufferReader;
use crate::core::session::SessionHandle;
use crate::error::{BufferError, CaptureError};
use crate::utils::text::{is_url, preview};

/// Inline messages from the loop to the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A new clipboard item was adopted
    Copied { preview: String },
    /// Reading the clipboard started failing
    ReadFailed { error: String },
    /// Reading the clipboard works again
    ReadRecovered,
    /// Writing the previous item failed
    WriteFailed { error: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Copied { preview } => write!(f, "[monitor: copied \"{} ...\"]", preview),
            Notice::ReadFailed { error } => write!(
                f,
                "[monitor: cannot read clipboard ({}); still retrying]",
                error
            ),
            Notice::ReadRecovered => write!(f, "[monitor: clipboard readable again]"),
            Notice::WriteFailed { error } => {
                write!(f, "[monitor: FAILED to write previous item: {}]", error)
            }
        }
    }
}

/// Result of comparing one read against the last observed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First read; content already on the clipboard is ignored
    Baseline,
    Unchanged,
    /// Changed to a URL; baseline moved, nothing captured
    UrlIgnored,
    /// Genuine change to capture
    Changed,
}

/// Adjacent-change detection over successive clipboard reads.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    last_observed: Option<String>,
    url_filter: bool,
}

impl ChangeDetector {
    pub fn new(url_filter: bool) -> Self {
        Self {
            last_observed: None,
            url_filter,
        }
    }

    pub fn observe(&mut self, current: &str) -> Observation {
        let Some(last) = &self.last_observed else {
            self.last_observed = Some(current.to_string());
            return Observation::Baseline;
        };
        if last == current {
            return Observation::Unchanged;
        }
        self.last_observed = Some(current.to_string());
        if self.url_filter && is_url(current) {
            Observation::UrlIgnored
        } else {
            Observation::Changed
        }
    }

    pub fn is_watching(&self) -> bool {
        self.last_observed.is_some()
    }

    pub fn last_observed(&self) -> Option<&str> {
        self.last_observed.as_deref()
    }
}

/// The polling task. Built by the session controller and consumed by [`CaptureLoop::run`].
pub struct CaptureLoop {
    session: SessionHandle,
    reader: Arc<dyn BufferReader>,
    detector: ChangeDetector,
    interval: Duration,
    preview_chars: usize,
    notices: mpsc::UnboundedSender<Notice>,
    read_failing: bool,
}

impl CaptureLoop {
    pub fn new(
        session: SessionHandle,
        reader: Arc<dyn BufferReader>,
        config: &CaptureConfig,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        Self {
            session,
            reader,
            detector: ChangeDetector::new(config.url_filter),
            interval: config.poll_interval,
            preview_chars: config.preview_chars,
            notices,
            read_failing: false,
        }
    }

    /// Poll until `shutdown` turns true (or its sender is dropped).
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("capture loop received shutdown");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if self.poll().await.is_break() {
                        break;
                    }
                }
            }
        }
        debug!("capture loop exited");
    }

    /// One tick: read the clipboard and react to it.
    pub async fn poll(&mut self) -> ControlFlow<()> {
        let reader = Arc::clone(&self.reader);
        let read = match tokio::task::spawn_blocking(move || reader.read()).await {
            Ok(read) => read,
            Err(e) => Err(BufferError::Unavailable(format!("reader task failed: {}", e))),
        };

        match read {
            Ok(content) => {
                if self.read_failing {
                    self.read_failing = false;
                    info!(reader = self.reader.name(), "clipboard readable again");
                    self.notify(Notice::ReadRecovered);
                }
                self.handle_content(content)
            }
            Err(e) => {
                warn!(reader = self.reader.name(), error = %e, "clipboard read failed");
                if !self.read_failing {
                    self.read_failing = true;
                    self.notify(Notice::ReadFailed {
                        error: e.to_string(),
                    });
                }
                ControlFlow::Continue(())
            }
        }
    }

    /// Apply one successful read to the detector and the session.
    pub fn handle_content(&mut self, content: String) -> ControlFlow<()> {
        match self.detector.observe(&content) {
            Observation::Baseline => {
                debug!(chars = content.chars().count(), "baseline read; existing clipboard ignored");
            }
            Observation::Unchanged => trace!("clipboard unchanged"),
            Observation::UrlIgnored => debug!("copied URL ignored"),
            Observation::Changed => {
                let shown = preview(&content, self.preview_chars).to_string();
                match self.session.capture(content) {
                    Ok(written) => {
                        if let Some(record) = written {
                            debug!(chars = record.content.len(), "previous item written");
                        }
                        self.notify(Notice::Copied { preview: shown });
                    }
                    Err(CaptureError::StreamFinalized) => {
                        debug!("output finalized; capture loop stopping");
                        return ControlFlow::Break(());
                    }
                    Err(e) => {
                        error!(error = %e, "failed to write clipboard item");
                        self.notify(Notice::WriteFailed {
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn notify(&self, notice: Notice) {
        // Nobody listening is fine; the notice is also in the logs.
        let _ = self.notices.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::ScriptedReader;
    use crate::core::output::{JsonArrayWriter, MemorySink, OutputSink};
    use crate::core::record::Record;
    use pretty_assertions::assert_eq;

    fn setup(
        reader: ScriptedReader,
    ) -> (CaptureLoop, SessionHandle, MemorySink, mpsc::UnboundedReceiver<Notice>) {
        let sink = MemorySink::new();
        let (capture, handle, rx) = setup_with_sink(reader, Box::new(sink.clone()));
        (capture, handle, sink, rx)
    }

    fn setup_with_sink(
        reader: ScriptedReader,
        sink: Box<dyn OutputSink>,
    ) -> (CaptureLoop, SessionHandle, mpsc::UnboundedReceiver<Notice>) {
        let mut writer = JsonArrayWriter::new(sink);
        writer.open().unwrap();
        let handle = SessionHandle::new(writer);
        let (tx, rx) = mpsc::unbounded_channel();
        let config = CaptureConfig {
            poll_interval: Duration::from_millis(5),
            ..CaptureConfig::default()
        };
        let capture = CaptureLoop::new(handle.clone(), Arc::new(reader), &config, tx);
        (capture, handle, rx)
    }

    /// Refuses every record but lets the brackets through.
    struct FullDisk;

    impl OutputSink for FullDisk {
        fn write_line(&mut self, text: &str) -> std::io::Result<()> {
            if text == "[" || text == "]" {
                Ok(())
            } else {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"))
            }
        }

        fn describe(&self) -> String {
            "full disk".to_string()
        }
    }

    fn contents(sink: &MemorySink) -> Vec<String> {
        let records: Vec<Record> = serde_json::from_str(&sink.contents()).unwrap();
        records.into_iter().map(|r| r.content).collect()
    }

    #[test]
    fn detector_ignores_baseline_and_repeats() {
        let mut detector = ChangeDetector::new(true);
        assert!(!detector.is_watching());
        assert_eq!(detector.observe("old"), Observation::Baseline);
        assert!(detector.is_watching());
        assert_eq!(detector.observe("old"), Observation::Unchanged);
        assert_eq!(detector.observe("new"), Observation::Changed);
        assert_eq!(detector.observe("new"), Observation::Unchanged);
    }

    #[test]
    fn url_moves_the_baseline_without_capturing() {
        let mut detector = ChangeDetector::new(true);
        detector.observe("text");
        assert_eq!(detector.observe("https://example.com"), Observation::UrlIgnored);
        assert_eq!(detector.last_observed(), Some("https://example.com"));
        // Compared against the URL, not the pre-URL value.
        assert_eq!(detector.observe("text"), Observation::Changed);
    }

    #[test]
    fn url_filter_can_be_disabled() {
        let mut detector = ChangeDetector::new(false);
        detector.observe("");
        assert_eq!(detector.observe("http://example.com"), Observation::Changed);
    }

    #[test]
    fn baseline_content_is_never_written() {
        let (mut capture, handle, sink, _rx) = setup(ScriptedReader::default());
        assert_eq!(capture.handle_content("already there".into()), ControlFlow::Continue(()));
        assert_eq!(capture.handle_content("copied".into()), ControlFlow::Continue(()));
        handle.close().unwrap();
        assert_eq!(contents(&sink), vec!["copied"]);
    }

    #[test]
    fn urls_never_become_records() {
        let (mut capture, handle, sink, mut rx) = setup(ScriptedReader::default());
        for read in ["start", "first", "HTTP://example.com/a", "second"] {
            assert_eq!(capture.handle_content(read.into()), ControlFlow::Continue(()));
        }
        handle.close().unwrap();
        assert_eq!(contents(&sink), vec!["first", "second"]);

        let mut copied = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            copied.push(notice);
        }
        assert_eq!(
            copied,
            vec![
                Notice::Copied { preview: "first".into() },
                Notice::Copied { preview: "second".into() },
            ]
        );
    }

    #[test]
    fn loop_stops_once_output_is_finalized() {
        let (mut capture, handle, _sink, _rx) = setup(ScriptedReader::default());
        assert_eq!(capture.handle_content("base".into()), ControlFlow::Continue(()));
        handle.close().unwrap();
        assert_eq!(capture.handle_content("after".into()), ControlFlow::Break(()));
    }

    #[tokio::test]
    async fn write_failures_are_reported_and_polling_continues() {
        let reader = ScriptedReader::new([Some("base"), Some("one"), Some("two"), Some("three")]);
        let (mut capture, handle, mut rx) = setup_with_sink(reader, Box::new(FullDisk));
        for _ in 0..4 {
            assert_eq!(capture.poll().await, ControlFlow::Continue(()));
        }

        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        assert_eq!(notices.len(), 3);
        assert_eq!(notices[0], Notice::Copied { preview: "one".into() });
        assert!(matches!(notices[1], Notice::WriteFailed { .. }));
        assert!(matches!(notices[2], Notice::WriteFailed { .. }));
        assert!(notices[1].to_string().contains("output write failed"));

        // The newest copy is still pending despite the failed writes.
        assert_eq!(handle.pending().unwrap().content, "three");
        assert_eq!(handle.records_written(), 0);
    }

    #[tokio::test]
    async fn read_failures_are_reported_once_and_polling_continues() {
        let reader = ScriptedReader::new([Some("base"), None, None, Some("fresh")]);
        let (mut capture, handle, sink, mut rx) = setup(reader);
        for _ in 0..4 {
            assert_eq!(capture.poll().await, ControlFlow::Continue(()));
        }
        handle.close().unwrap();

        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        assert_eq!(notices.len(), 3);
        assert!(matches!(notices[0], Notice::ReadFailed { .. }));
        assert_eq!(notices[1], Notice::ReadRecovered);
        assert_eq!(notices[2], Notice::Copied { preview: "fresh".into() });
        assert_eq!(contents(&sink), vec!["fresh"]);
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_long_sleep() {
        let (mut capture, _handle, _sink, _rx) = setup(ScriptedReader::new([Some("x")]));
        capture.interval = Duration::from_secs(3600);
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(capture.run(rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("loop must stop without waiting for the next tick")
            .unwrap();
    }

    #[test]
    fn notice_text() {
        assert_eq!(
            Notice::Copied { preview: "hello worl".into() }.to_string(),
            "[monitor: copied \"hello worl ...\"]"
        );
    }
}
