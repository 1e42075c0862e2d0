//! Block Kit rendering for notifications.
//!
//! Blocks are wrapped in a single attachment so Slack draws the color bar.

use beacon_core::message::{Notification, NotificationKind, Urgency};
use serde_json::{json, Value};

/// Hook notifications share one color regardless of kind.
const HOOK_COLOR: &str = "#FFA500";

const OPTIONS_HINT: &str = "Reply with a number or type a full response.";

fn urgency_style(urgency: Urgency) -> (&'static str, &'static str) {
    match urgency {
        Urgency::High => ("#FF0000", ":rotating_light:"),
        Urgency::Normal => ("#FFA500", ":bell:"),
        Urgency::Low => ("#36A64F", ":information_source:"),
    }
}

fn hook_header(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Completed => ":white_check_mark: Task Completed",
        NotificationKind::Error => ":x: Tool Error",
        NotificationKind::Question => ":question: Claude needs your input",
        NotificationKind::Permission => ":lock: Permission Needed",
    }
}

fn section(text: String) -> Value {
    json!({ "type": "section", "text": { "type": "mrkdwn", "text": text } })
}

fn preformatted(text: &str) -> Value {
    json!({
        "type": "rich_text",
        "elements": [{
            "type": "rich_text_preformatted",
            "elements": [{ "type": "text", "text": text }],
        }],
    })
}

fn numbered(options: &[String]) -> String {
    let list = options
        .iter()
        .enumerate()
        .map(|(i, opt)| format!("*{}.* {opt}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{list}\n\n{OPTIONS_HINT}")
}

/// Render a notification as the `attachments` array of a post.
pub fn render_attachments(notification: &Notification) -> Value {
    let (color, header) = match notification.urgency {
        Some(urgency) => {
            let (color, emoji) = urgency_style(urgency);
            (color, format!("{emoji} Claude needs your input"))
        }
        None => (HOOK_COLOR, hook_header(notification.kind).to_string()),
    };

    let mention = notification
        .mention
        .as_deref()
        .map(|id| format!("<@{id}> "))
        .unwrap_or_default();

    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": header, "emoji": true },
        }),
        section(format!("{mention}*{}*", notification.headline)),
    ];

    if let Some(ref body) = notification.body {
        blocks.push(section(body.clone()));
    }
    if let Some(ref context) = notification.context {
        blocks.push(preformatted(context));
    }
    if !notification.options.is_empty() {
        blocks.push(section(numbered(&notification.options)));
    }
    blocks.push(json!({ "type": "divider" }));

    json!([{ "color": color, "blocks": blocks }])
}
