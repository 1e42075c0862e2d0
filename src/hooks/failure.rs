use super::HookContext;
use beacon_core::{
    event::ToolFailedEvent,
    message::{Notification, NotificationKind},
    text::truncate_with_ellipsis,
};
use serde_json::{Map, Value};

const COMMAND_MAX_CHARS: usize = 500;
const INPUT_MAX_CHARS: usize = 300;
const ERROR_MAX_CHARS: usize = 1000;
/// Plugin tools (`mcp__server__tool`) show only this many input fields.
const PLUGIN_FIELDS: usize = 3;

/// Short description of what the failed tool was working on.
pub fn extract_tool_context(tool_name: &str, tool_input: &Map<String, Value>) -> String {
    match tool_name {
        "Bash" => truncate_with_ellipsis(str_field(tool_input, "command"), COMMAND_MAX_CHARS),
        "Write" | "Edit" | "Read" => str_field(tool_input, "file_path").to_string(),
        name if name.contains("mcp__") => {
            let partial: Map<String, Value> = tool_input
                .iter()
                .take(PLUGIN_FIELDS)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            truncate_with_ellipsis(&Value::Object(partial).to_string(), INPUT_MAX_CHARS)
        }
        _ => truncate_with_ellipsis(
            &Value::Object(tool_input.clone()).to_string(),
            INPUT_MAX_CHARS,
        ),
    }
}

fn str_field<'a>(input: &'a Map<String, Value>, key: &str) -> &'a str {
    input.get(key).and_then(Value::as_str).unwrap_or_default()
}

pub(super) async fn notify(event: &ToolFailedEvent, ctx: &HookContext) {
    let context = extract_tool_context(&event.tool_name, &event.tool_input);
    let error = truncate_with_ellipsis(&event.error, ERROR_MAX_CHARS);

    let notification =
        Notification::new(NotificationKind::Error, format!("{} failed", event.tool_name))
            .with_body(Some(error))
            .with_context(Some(context))
            .with_mention(ctx.mention());
    ctx.post(format!("Tool error: {}", event.tool_name), notification)
        .await;
}
