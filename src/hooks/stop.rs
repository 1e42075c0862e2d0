use super::HookContext;
use beacon_core::{
    event::StoppedEvent,
    message::{Notification, NotificationKind},
    text::truncate_with_ellipsis,
};
use tracing::{debug, info};

const SUMMARY_MAX_CHARS: usize = 200;
const NO_SUMMARY: &str = "Task completed (no summary available)";

/// One-line summary of the assistant's final message: its first sentence,
/// capped at 200 characters.
pub fn extract_summary(last_message: &str) -> String {
    if last_message.trim().is_empty() {
        return NO_SUMMARY.to_string();
    }
    let sentence = first_sentence(last_message).unwrap_or(last_message);
    truncate_with_ellipsis(sentence.trim(), SUMMARY_MAX_CHARS)
}

/// Text up to and including the first `.`, `!` or `?` that is followed by
/// whitespace or the end of the input.
fn first_sentence(text: &str) -> Option<&str> {
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
        if at_boundary {
            return Some(&text[..idx + c.len_utf8()]);
        }
    }
    None
}

pub(super) async fn notify(event: &StoppedEvent, ctx: &HookContext) {
    if event.stop_hook_active {
        info!("hook: stop_hook_active set, skipping completion notice");
        return;
    }

    let summary = extract_summary(&event.last_assistant_message);
    let notification =
        Notification::new(NotificationKind::Completed, summary.clone()).with_mention(ctx.mention());
    if ctx.post(summary, notification).await.is_some() {
        debug!("hook: completion notice posted for {}", event.common.session_id);
    }
}
