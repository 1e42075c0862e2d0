use super::HookContext;
use crate::mcp::ASK_TOOL_NAME;
use beacon_core::{
    event::PermissionRequestedEvent,
    message::{Notification, NotificationKind},
    text::{preview, truncate_with_ellipsis},
};
use serde_json::{Map, Value};
use tracing::debug;

const COMMAND_MAX_CHARS: usize = 300;
const INPUT_MAX_CHARS: usize = 200;
const DEFAULT_QUESTION: &str = "Question from Claude";
const REPLY_HINT: &str = "Reply with a number or type a full response.";

/// What the tool is about to do, in one line.
pub fn extract_action_description(tool_name: &str, tool_input: &Map<String, Value>) -> String {
    let field = |key: &str, fallback: &'static str| -> String {
        tool_input
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    };
    match tool_name {
        "Bash" => truncate_with_ellipsis(
            &format!("Run: {}", field("command", "unknown command")),
            COMMAND_MAX_CHARS,
        ),
        "Write" => format!("Write to: {}", field("file_path", "unknown file")),
        "Edit" => format!("Edit: {}", field("file_path", "unknown file")),
        "Read" => format!("Read: {}", field("file_path", "unknown file")),
        _ => {
            let json = Value::Object(tool_input.clone()).to_string();
            format!("{tool_name} — {}", preview(&json, INPUT_MAX_CHARS))
        }
    }
}

/// Tool names may carry a namespace, e.g. `mcp__beacon__ask_human_via_slack`.
fn is_ask_human(tool_name: &str) -> bool {
    tool_name.contains(ASK_TOOL_NAME)
}

fn question_notification(tool_input: &Map<String, Value>) -> Notification {
    let question = tool_input
        .get("question")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_QUESTION);
    let options: Vec<&str> = tool_input
        .get("options")
        .and_then(Value::as_array)
        .map(|opts| opts.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let body = (!options.is_empty()).then(|| {
        let numbered: Vec<String> = options
            .iter()
            .enumerate()
            .map(|(i, opt)| format!("{}. {opt}", i + 1))
            .collect();
        format!("{}\n\n{REPLY_HINT}", numbered.join("\n"))
    });
    Notification::new(NotificationKind::Question, question).with_body(body)
}

pub(super) async fn notify(event: &PermissionRequestedEvent, ctx: &HookContext) {
    let notification = if is_ask_human(&event.tool_name) {
        question_notification(&event.tool_input)
    } else {
        let action = extract_action_description(&event.tool_name, &event.tool_input);
        Notification::new(
            NotificationKind::Permission,
            format!("Claude wants to use: {}", event.tool_name),
        )
        .with_body(Some(action))
    };
    let notification = notification.with_mention(ctx.mention());

    let text = format!("Permission needed: {}", event.tool_name);
    let Some(posted) = ctx.post(text, notification).await else {
        return;
    };
    match posted.message_id {
        Some(thread_id) => ctx.launcher.launch(
            &event.common.transcript_path,
            &thread_id,
            &ctx.config.slack.channel_id,
        ),
        None => debug!("hook: permission notice posted without a message id, no watcher"),
    }
}
