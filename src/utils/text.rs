// src/utils/text.rs
//! Small text helpers shared by the capture engine and the card converter

/// Inline line-break marker used in place of newlines.
pub const BREAK_MARKER: &str = "<br>";

/// Replacement for a single tab character.
pub const TAB_MARKER: &str = "&nbsp;&nbsp;&nbsp;&nbsp;";

/// Flatten text for line-oriented consumers.
///
/// `\r\n`, `\n` and `\r` each become one [`BREAK_MARKER`]; tabs become
/// [`TAB_MARKER`].
pub fn normalize_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str(BREAK_MARKER);
            }
            '\n' => out.push_str(BREAK_MARKER),
            '\t' => out.push_str(TAB_MARKER),
            other => out.push(other),
        }
    }
    out
}

/// Like [`normalize_breaks`], but every `\n` and every `\r` is its own
/// break, so `\r\n` becomes two markers. Card imports expect this.
pub fn flatten_each_break(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' | '\n' => out.push_str(BREAK_MARKER),
            '\t' => out.push_str(TAB_MARKER),
            other => out.push(other),
        }
    }
    out
}

/// True when `text` starts with `http://` or `https://`, ignoring case.
pub fn is_url(text: &str) -> bool {
    let head: String = text.chars().take(8).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("http://") || head.starts_with("https://")
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
