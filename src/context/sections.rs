//! Labeled context sections in their fixed order

use crate::store::Message;
use std::fmt::Write as _;

pub const BACKGROUND_HEADER: &str = "=== Conversation Background ===\n";
pub const STYLE_HEADER: &str = "=== User Language Style ===\n";
pub const HISTORY_HEADER: &str = "=== Recent Conversation History ===\n";
pub const INPUT_HEADER: &str = "=== Current Input ===\n";

/// Compose background, style, history (oldest first) and current input.
///
/// Empty background, style or history sections are omitted entirely; the
/// current input section is always present.
pub fn compose(
    summary_prompt: &str,
    style_prompt: &str,
    history: &[Message],
    sender_id: &str,
    input: &str,
) -> String {
    let mut context = String::new();

    if !summary_prompt.is_empty() {
        context.push_str(BACKGROUND_HEADER);
        context.push_str(summary_prompt);
        context.push_str("\n\n");
    }

    if !style_prompt.is_empty() {
        context.push_str(STYLE_HEADER);
        context.push_str(style_prompt);
        context.push_str("\n\n");
    }

    if !history.is_empty() {
        context.push_str(HISTORY_HEADER);
        for message in history {
            let _ = writeln!(context, "[{}]: {}", message.sender_id, message.content);
        }
        context.push('\n');
    }

    context.push_str(INPUT_HEADER);
    let _ = write!(context, "[{}]: {}", sender_id, input);

    context
}
