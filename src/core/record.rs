// src/core/record.rs
//! Capture data model: user metadata, the pending clipboard item and the
//! immutable record written for it.

use serde::{Deserialize, Serialize};

use crate::utils::text::normalize_breaks;

/// Token appended to the tag while extract tagging is on.
pub const EXTRACT_TAG: &str = "extract";

/// User-entered annotations applied to captured items.
///
/// `source`, `tag` and `is_extract` are sticky; `note` is consumed by the
/// next finalized record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub source: String,
    pub tag: String,
    pub note: String,
    pub is_extract: bool,
}

impl Metadata {
    /// Tag as written to a record: the base tag plus [`EXTRACT_TAG`] when on.
    pub fn effective_tag(&self) -> String {
        let extract = if self.is_extract { EXTRACT_TAG } else { "" };
        format!("{} {}", self.tag, extract).trim().to_string()
    }
}

/// Most recent clipboard value that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedItem {
    pub content: String,
}

impl CapturedItem {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Whitespace-only items are never written.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// One element of the capture file's JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub note: String,
    pub content: String,
    pub source: String,
    pub tag: String,
}

impl Record {
    /// Build a record from a metadata snapshot and (optionally) the pending item.
    pub fn build(metadata: &Metadata, item: Option<&CapturedItem>) -> Self {
        Self {
            note: metadata.note.clone(),
            content: item
                .map(|i| normalize_breaks(&i.content))
                .unwrap_or_default(),
            source: metadata.source.clone(),
            tag: metadata.effective_tag(),
        }
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
