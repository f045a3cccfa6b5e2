//! Shared utility functions.

/// Shorten `s` to at most `max_bytes` bytes on a character boundary,
/// appending `…` when anything was cut.
///
/// Used to keep vendor error bodies readable inside event messages.
pub fn truncate_for_display(s: &str, max_bytes: usize) -> String {
    let s = s.trim();
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let end = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|i| *i <= max_bytes)
        .last()
        .unwrap_or(0);
    format!("{}…", &s[..end])
}
