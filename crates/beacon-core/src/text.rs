//! Character-bounded string helpers shared by notifiers and loggers.

/// Truncate `text` to at most `max` characters, appending `...` when cut.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// The first `max` characters of `text`, without any marker.
pub fn preview(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
