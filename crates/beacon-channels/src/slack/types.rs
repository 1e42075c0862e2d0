//! Slack Web API deserialization types.

use beacon_core::message::ThreadMessage;
use serde::Deserialize;

/// Every Web API response carries `ok` and, on failure, `error`.
#[derive(Debug, Deserialize)]
pub(crate) struct SlackResponse<T> {
    pub ok: bool,
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> SlackResponse<T> {
    pub fn error_code(&self) -> String {
        self.error.clone().unwrap_or_else(|| "unknown_error".to_string())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostMessageBody {
    pub ts: Option<String>,
    pub channel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthTestBody {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepliesBody {
    #[serde(default)]
    pub messages: Vec<SlackMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlackMessage {
    pub ts: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub subtype: Option<String>,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    pub text: Option<String>,
}

impl From<SlackMessage> for ThreadMessage {
    fn from(msg: SlackMessage) -> Self {
        Self {
            id: msg.ts,
            text: msg.text.filter(|t| !t.is_empty()),
            user: msg.user,
            bot_id: msg.bot_id,
            kind: msg.kind,
            subtype: msg.subtype,
        }
    }
}
