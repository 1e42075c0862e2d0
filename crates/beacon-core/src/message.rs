use serde::{Deserialize, Serialize};

/// How loudly a question is presented.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High,
    #[default]
    Normal,
    Low,
}

/// What a notification is about. Drives its header and label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// A question asked through the ask-human tool.
    Question,
    Permission,
    Completed,
    Error,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Question => "QUESTION",
            Self::Permission => "PERMISSION",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }
}

/// A structured notification, rendered by the chat client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Set only for ask-human questions; hook notifications use a fixed style.
    pub urgency: Option<Urgency>,
    pub headline: String,
    pub body: Option<String>,
    /// Shown as a preformatted block (code, commands, errors).
    pub context: Option<String>,
    /// Numbered choices the human may answer with.
    #[serde(default)]
    pub options: Vec<String>,
    /// User id to @mention.
    pub mention: Option<String>,
}

impl Notification {
    pub fn new(kind: NotificationKind, headline: impl Into<String>) -> Self {
        Self {
            kind,
            urgency: None,
            headline: headline.into(),
            body: None,
            context: None,
            options: Vec::new(),
            mention: None,
        }
    }

    pub fn with_body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context.filter(|c| !c.is_empty());
        self
    }

    pub fn with_mention(mut self, mention: Option<String>) -> Self {
        self.mention = mention;
        self
    }
}

/// A message to post. Either a top-level notification or a plain thread reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Plain-text fallback (also used for previews and push notifications).
    pub text: String,
    /// Root message id when replying in a thread.
    pub thread_id: Option<String>,
    pub notification: Option<Notification>,
}

impl OutgoingMessage {
    pub fn notification(text: impl Into<String>, notification: Notification) -> Self {
        Self {
            text: text.into(),
            thread_id: None,
            notification: Some(notification),
        }
    }

    pub fn thread_reply(thread_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            thread_id: Some(thread_id.into()),
            notification: None,
        }
    }
}

/// What the chat platform returned for a successful post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    /// Platform id of the new message; the thread root for follow-ups.
    pub message_id: Option<String>,
}

/// A thread on the chat platform: the root message and its channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    pub channel: String,
    pub root_id: String,
}

impl ThreadRef {
    pub fn new(channel: impl Into<String>, root_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            root_id: root_id.into(),
        }
    }
}

/// A message read back from a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub text: Option<String>,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    /// Platform message type tag (legacy bot posts use `bot_message`).
    pub kind: Option<String>,
    pub subtype: Option<String>,
}

impl ThreadMessage {
    /// Whether the message was posted by an integration rather than a person.
    pub fn is_bot(&self) -> bool {
        self.bot_id.is_some()
            || self.kind.as_deref() == Some("bot_message")
            || self.subtype.as_deref() == Some("bot_message")
    }
}

/// A substantive reply found by the poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanReply {
    pub text: String,
    pub user: Option<String>,
    pub message_id: String,
}

/// Outcome of one poll window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    pub reply: Option<HumanReply>,
    pub elapsed_ms: u64,
}

impl PollResult {
    pub fn found(&self) -> bool {
        self.reply.is_some()
    }
}

/// Successful answer returned to the ask-human caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub reply: String,
    pub replied_by: String,
    pub response_time_ms: u64,
    pub selected_option: Option<String>,
    pub selected_option_index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_default_and_serde() {
        assert_eq!(Urgency::default(), Urgency::Normal);
        let u: Urgency = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(u, Urgency::High);
        assert!(serde_json::from_str::<Urgency>("\"critical\"").is_err());
    }

    #[test]
    fn test_is_bot_markers() {
        let human = ThreadMessage {
            id: "1.1".into(),
            text: Some("hi".into()),
            user: Some("U1".into()),
            ..Default::default()
        };
        assert!(!human.is_bot());

        let with_bot_id = ThreadMessage {
            bot_id: Some("B1".into()),
            ..human.clone()
        };
        assert!(with_bot_id.is_bot());

        let legacy = ThreadMessage {
            subtype: Some("bot_message".into()),
            ..human.clone()
        };
        assert!(legacy.is_bot());

        let typed = ThreadMessage {
            kind: Some("bot_message".into()),
            ..human
        };
        assert!(typed.is_bot());
    }

    #[test]
    fn test_empty_context_is_dropped() {
        let n = Notification::new(NotificationKind::Error, "Bash failed")
            .with_context(Some(String::new()));
        assert!(n.context.is_none());
    }

    #[test]
    fn test_tool_response_serializes_nulls() {
        let resp = ToolResponse {
            reply: "sure".into(),
            replied_by: "U1".into(),
            response_time_ms: 1200,
            selected_option: None,
            selected_option_index: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["selected_option"].is_null());
        assert!(json["selected_option_index"].is_null());
        assert_eq!(json["response_time_ms"], 1200);
    }
}
