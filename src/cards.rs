// src/cards.rs
//! Flashcard export
//!
//! Turns a capture file into tab-delimited lines for a spaced-repetition
//! importer: `front \t back \t tag`, one card per record with content.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConvertError;
use crate::utils::text::{flatten_each_break, BREAK_MARKER};

/// Front text for cards without a note.
pub const PLACEHOLDER_FRONT: &str = "todo";

/// One element of a capture file as the converter reads it.
///
/// Only `content` is required; the other fields may be missing or `null`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CardSource {
    pub content: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Render one card line (without the trailing newline).
pub fn card_line(entry: &CardSource) -> String {
    let front = non_empty(&entry.note)
        .map(flatten_each_break)
        .unwrap_or_else(|| PLACEHOLDER_FRONT.to_string());

    let mut back = flatten_each_break(&entry.content);
    if let Some(source) = non_empty(&entry.source) {
        back.push_str(BREAK_MARKER);
        back.push_str(BREAK_MARKER);
        back.push_str("source: ");
        back.push_str(source);
    }

    let tag = entry.tag.as_deref().unwrap_or_default();
    format!("{}\t{}\t{}", front, back, tag)
}

/// Render all cards; entries with empty content are skipped.
pub fn render(entries: &[CardSource]) -> String {
    entries
        .iter()
        .filter(|e| !e.content.is_empty())
        .map(|e| card_line(e) + "\n")
        .collect()
}

/// `<input>.txt`, next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".txt");
    PathBuf::from(name)
}

/// Convert `input` into a card file at `output`, returning the card count.
///
/// The input is fully read and parsed before `output` is created, so a
/// bad input never leaves a partial file behind.
pub fn convert_file(input: &Path, output: &Path) -> Result<usize, ConvertError> {
    if !input.exists() {
        return Err(ConvertError::MissingInput(input.to_path_buf()));
    }

    let raw = fs::read_to_string(input).map_err(|source| ConvertError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let entries: Vec<CardSource> =
        serde_json::from_str(&raw).map_err(|source| ConvertError::Parse {
            path: input.to_path_buf(),
            source,
        })?;
    debug!(entries = entries.len(), input = %input.display(), "capture file parsed");

    let text = render(&entries);
    let cards = entries.iter().filter(|e| !e.content.is_empty()).count();

    fs::write(output, text).map_err(|source| ConvertError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    info!(cards, output = %output.display(), "card file written");
    Ok(cards)
}
