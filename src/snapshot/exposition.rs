//! Exposition Renderer: plaintext gauge lines for pull-based scrapers.
//!
//! ```text
//! # HELP redis_queue_length Length of Redis queue
//! # TYPE redis_queue_length gauge
//! redis_queue_length{db="0",queue="jobs"} 5
//! ```
//!
//! Line order follows map iteration and is not stable between renders.

use std::borrow::Cow;
use std::fmt::Write;

use crate::snapshot::QueueKey;

pub const METRIC_NAME: &str = "redis_queue_length";
pub const METRIC_HELP: &str = "Length of Redis queue";

pub fn render_entries<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a QueueKey, &'a u64)>,
{
    let mut out = String::with_capacity(128);
    let _ = writeln!(out, "# HELP {} {}", METRIC_NAME, METRIC_HELP);
    let _ = writeln!(out, "# TYPE {} gauge", METRIC_NAME);
    for (key, len) in entries {
        let _ = writeln!(
            out,
            "{}{{db=\"{}\",queue=\"{}\"}} {}",
            METRIC_NAME,
            key.db,
            escape_label_value(&key.queue),
            len
        );
    }
    out
}

/// Escapes `\`, `"` and newlines so arbitrary key names stay on one well-formed line.
/// Bytes that are not UTF-8 are written as an escaped `\xNN`, so distinct binary names
/// stay distinct series.
pub fn escape_label_value(value: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(value) {
        if !text.contains(['\\', '"', '\n']) {
            return Cow::Borrowed(text);
        }
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for chunk in value.utf8_chunks() {
        for c in chunk.valid().chars() {
            match c {
                '\\' => escaped.push_str(r"\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str(r"\n"),
                other => escaped.push(other),
            }
        }
        for byte in chunk.invalid() {
            let _ = write!(escaped, r"\\x{:02x}", byte);
        }
    }
    Cow::Owned(escaped)
}
