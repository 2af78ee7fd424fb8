// src/core/commands.rs
//! Interactive command session
//!
//! A prompt loop over a fixed command table. Every command is plain data
//! ([`Command`]) and dispatch happens against the one [`CaptureSession`]
//! the loop was built with. While waiting for input the loop also prints
//! notices from the capture loop as they arrive.

use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::core::capture_loop::Notice;
use crate::core::session::CaptureSession;
use crate::error::CaptureError;

/// What a command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SetSource,
    SetTag,
    SetNote,
    Print,
    ToggleExtract,
    Quit,
    Help,
}

/// One entry of the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub alias: &'static str,
    pub description: &'static str,
    pub action: Action,
}

impl Command {
    /// Key shown (and sorted on) in the help listing.
    pub fn display_key(&self) -> String {
        format!("{} | {}", self.alias, self.name)
    }
}

pub const COMMANDS: &[Command] = &[
    Command {
        name: "source",
        alias: "s",
        description: "sets the source",
        action: Action::SetSource,
    },
    Command {
        name: "tag",
        alias: "t",
        description: "sets the tag",
        action: Action::SetTag,
    },
    Command {
        name: "note",
        alias: "n",
        description: "adds a note",
        action: Action::SetNote,
    },
    Command {
        name: "print",
        alias: "p",
        description: "prints current clipboard entry",
        action: Action::Print,
    },
    Command {
        name: "extract",
        alias: "x",
        description: "toggles the \"extract\" tag",
        action: Action::ToggleExtract,
    },
    Command {
        name: "quit",
        alias: "q",
        description: "quits",
        action: Action::Quit,
    },
    Command {
        name: "help",
        alias: "h",
        description: "prints available commands",
        action: Action::Help,
    },
];

/// Find a command by full name or alias.
pub fn lookup(entry: &str) -> Option<&'static Command> {
    COMMANDS
        .iter()
        .find(|c| c.name == entry || c.alias == entry)
}

/// Help listing, sorted by display key and aligned to the widest key.
pub fn help_text() -> String {
    let mut items: Vec<(String, &str)> = COMMANDS
        .iter()
        .map(|c| (c.display_key(), c.description))
        .collect();
    items.sort();
    let width = items.iter().map(|(key, _)| key.len()).max().unwrap_or(0) + 1;

    let mut text = String::from("Available commands:\n");
    for (key, description) in items {
        text.push_str(&format!("  {:<width$}: {}\n", key, description, width = width));
    }
    text.push('\n');
    text
}

pub const BANNER: &str = "Starting monitor.  Anything copied to the clipboard will be logged.";

/// How the command session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    EndOfInput,
    Interrupted,
}

enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Foreground prompt loop bound to one capture session.
pub struct CommandSession<'a, R, W> {
    session: &'a mut CaptureSession,
    lines: Lines<R>,
    out: W,
    notices: Option<mpsc::UnboundedReceiver<Notice>>,
    interrupt: Option<watch::Receiver<bool>>,
    reported_stop: bool,
}

impl<'a, R, W> CommandSession<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(session: &'a mut CaptureSession, input: R, out: W) -> Self {
        let notices = session.take_notices();
        Self {
            session,
            lines: input.lines(),
            out,
            notices,
            interrupt: None,
            reported_stop: false,
        }
    }

    /// Treat `interrupt` turning true (e.g. Ctrl-C) like `quit`.
    pub fn with_interrupt(mut self, interrupt: watch::Receiver<bool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Run until quit, end of input or interrupt, then shut the capture down.
    ///
    /// Shutdown runs even if the loop fails part way.
    pub async fn run(mut self) -> Result<SessionEnd, CaptureError> {
        let outcome = self.dispatch_loop().await;

        let farewell = writeln!(self.out, "Goodbye!").and_then(|_| self.out.flush());
        let shutdown = self.session.shutdown().await;

        let end = outcome?;
        shutdown?;
        farewell?;
        info!(?end, "command session ended");
        Ok(end)
    }

    async fn dispatch_loop(&mut self) -> Result<SessionEnd, CaptureError> {
        writeln!(self.out, "{}", BANNER)?;
        write!(self.out, "{}", help_text())?;

        loop {
            self.report_unexpected_stop()?;
            let entry = match self.read_input("> ").await? {
                Input::Line(line) => line,
                Input::Eof => return Ok(SessionEnd::EndOfInput),
                Input::Interrupted => return Ok(SessionEnd::Interrupted),
            };
            let entry = entry.trim();

            let Some(command) = lookup(entry) else {
                debug!(entry, "unknown command");
                writeln!(self.out, "Unknown command {}", entry)?;
                write!(self.out, "{}", help_text())?;
                continue;
            };

            debug!(command = command.name, "dispatching");
            match command.action {
                Action::SetSource => match self.read_input("Enter the source: ").await? {
                    Input::Line(value) => self.session.set_source(value),
                    Input::Eof => return Ok(SessionEnd::EndOfInput),
                    Input::Interrupted => return Ok(SessionEnd::Interrupted),
                },
                Action::SetTag => match self.read_input("Enter the tag: ").await? {
                    Input::Line(value) => self.session.set_tag(value),
                    Input::Eof => return Ok(SessionEnd::EndOfInput),
                    Input::Interrupted => return Ok(SessionEnd::Interrupted),
                },
                Action::SetNote => match self.read_input("Enter a note: ").await? {
                    Input::Line(value) => self.session.set_note(value),
                    Input::Eof => return Ok(SessionEnd::EndOfInput),
                    Input::Interrupted => return Ok(SessionEnd::Interrupted),
                },
                Action::Print => {
                    let record = self.session.snapshot();
                    writeln!(self.out, "{}", record.to_pretty_json()?)?;
                }
                Action::ToggleExtract => {
                    let on = self.session.toggle_extract();
                    writeln!(
                        self.out,
                        "Tagging as an extract is now {}",
                        if on { "on" } else { "off" }
                    )?;
                }
                Action::Help => write!(self.out, "{}", help_text())?,
                Action::Quit => return Ok(SessionEnd::Quit),
            }
        }
    }

    /// Prompt and wait for one line, printing loop notices meanwhile.
    async fn read_input(&mut self, prompt: &str) -> io::Result<Input> {
        write!(self.out, "{}", prompt)?;
        self.out.flush()?;

        loop {
            tokio::select! {
                line = self.lines.next_line() => {
                    return match line {
                        Ok(Some(line)) => Ok(Input::Line(line)),
                        Ok(None) => {
                            writeln!(self.out)?;
                            Ok(Input::Eof)
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to read input; ending session");
                            writeln!(self.out)?;
                            Ok(Input::Eof)
                        }
                    };
                }
                Some(notice) = next_notice(&mut self.notices) => {
                    write!(self.out, "\n{}\n{}", notice, prompt)?;
                    self.out.flush()?;
                }
                _ = interrupted(&mut self.interrupt) => {
                    writeln!(self.out)?;
                    return Ok(Input::Interrupted);
                }
            }
        }
    }

    fn report_unexpected_stop(&mut self) -> io::Result<()> {
        if !self.reported_stop && self.session.loop_stopped_unexpectedly() {
            self.reported_stop = true;
            warn!("capture loop is no longer running");
            writeln!(
                self.out,
                "[monitor: capture has STOPPED; new copies are not being logged. Quit to save what was captured.]"
            )?;
        }
        Ok(())
    }
}

async fn next_notice(notices: &mut Option<mpsc::UnboundedReceiver<Notice>>) -> Option<Notice> {
    match notices {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn interrupted(interrupt: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = interrupt else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
