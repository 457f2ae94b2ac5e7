//! Budget enforcement for assembled contexts
//!
//! History is the cheapest section to lose: the background and style
//! sections ahead of it are always kept verbatim while any history remains.

use super::sections::HISTORY_HEADER;

/// Appended when the history section was cut
pub const TRUNCATION_MARKER: &str = "\n[context truncated]";

/// Appended when a context without a history section was cut
pub const ELLIPSIS: &str = "...";

/// Fit `context` into `max_chars` characters.
///
/// `headroom_chars` is reserved out of the history budget for the marker.
/// Contexts already within budget are returned unchanged.
pub fn truncate_context(context: &str, max_chars: usize, headroom_chars: usize) -> String {
    if context.chars().count() <= max_chars {
        return context.to_string();
    }

    let Some(history_start) = context.find(HISTORY_HEADER) else {
        return format!("{}{}", take_chars(context, max_chars), ELLIPSIS);
    };

    let (prefix, history) = context.split_at(history_start);
    let prefix_chars = prefix.chars().count();

    let available = max_chars
        .checked_sub(prefix_chars)
        .and_then(|rest| rest.checked_sub(headroom_chars))
        .unwrap_or(0);

    if available == 0 {
        return format!("{}{}", prefix, TRUNCATION_MARKER);
    }

    if history.chars().count() <= available {
        return context.to_string();
    }

    format!("{}{}{}", prefix, take_chars(history, available), TRUNCATION_MARKER)
}

/// Leading `n` characters of `s`
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((offset, _)) => &s[..offset],
        None => s,
    }
}
