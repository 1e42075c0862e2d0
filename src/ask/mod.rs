//! Ask-human protocol: post a question, wait two windows, report back.
//!
//! Flow: question → window 1 → "still waiting" nudge → window 2 →
//! timeout notice or confirmation. Only the question post can fail the call;
//! every thread notice is best-effort.


use crate::poller::ReplyWaiter;
use beacon_core::{
    config::Config,
    message::{
        HumanReply, Notification, NotificationKind, OutgoingMessage, ThreadRef, ToolResponse,
        Urgency,
    },
    traits::ChatClient,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Number of wait windows before giving up.
const WINDOWS: u32 = 2;

pub const STILL_WAITING_TEXT: &str = ":hourglass_flowing_sand: Still waiting for your reply...";
pub const TIMED_OUT_TEXT: &str =
    ":stopwatch: *Timed out.* Claude will attempt to continue without an answer.";
pub const RESPONSE_RECEIVED_TEXT: &str =
    ":white_check_mark: Response received — answer delivered to Claude.";

/// Arguments of the ask-human tool.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub urgency: Urgency,
    /// Accepted for thread continuity; not used for routing.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: None,
            options: None,
            urgency: Urgency::default(),
            session_id: None,
        }
    }

    fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AskError {
    #[error("Failed to post question to Slack")]
    PostFailed,
    #[error("Timeout: No human response received")]
    Timeout { windows: u32, timeout_minutes: f64 },
}

impl AskError {
    /// Structured error body returned to the tool caller.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::PostFailed => serde_json::json!({ "error": self.to_string() }),
            Self::Timeout {
                windows,
                timeout_minutes,
            } => serde_json::json!({
                "error": self.to_string(),
                "windows": windows,
                "timeout_minutes": timeout_minutes,
            }),
        }
    }
}

/// Runs one ask-human call against the configured channel.
pub struct AskHuman {
    chat: Arc<dyn ChatClient>,
    waiter: Arc<dyn ReplyWaiter>,
    config: Arc<Config>,
}

impl AskHuman {
    pub fn new(chat: Arc<dyn ChatClient>, waiter: Arc<dyn ReplyWaiter>, config: Arc<Config>) -> Self {
        Self {
            chat,
            waiter,
            config,
        }
    }

    pub async fn ask(&self, request: AskRequest) -> Result<ToolResponse, AskError> {
        let timing = &self.config.timing;
        if timing.send_delay_ms > 0 {
            tokio::time::sleep(timing.send_delay()).await;
        }

        if let Some(ref session) = request.session_id {
            debug!("ask: question from session {session}");
        }

        let asked_at = Instant::now();
        let thread = self.post_question(&request).await?;
        info!("ask: question posted (thread {})", thread.root_id);

        for window in 1..=WINDOWS {
            let result = self
                .waiter
                .wait_for_reply(&thread, timing.poll_timeout())
                .await;
            if let Some(reply) = result.reply {
                info!("ask: reply received in window {window} after {}ms", result.elapsed_ms);
                let response = build_response(reply, request.options(), asked_at);
                self.notify(&thread, RESPONSE_RECEIVED_TEXT).await;
                return Ok(response);
            }
            if window < WINDOWS {
                self.notify(&thread, STILL_WAITING_TEXT).await;
            }
        }

        self.notify(&thread, TIMED_OUT_TEXT).await;
        warn!("ask: no reply after {WINDOWS} windows");
        Err(AskError::Timeout {
            windows: WINDOWS,
            timeout_minutes: (timing.poll_timeout_ms * u64::from(WINDOWS)) as f64 / 60_000.0,
        })
    }

    async fn post_question(&self, request: &AskRequest) -> Result<ThreadRef, AskError> {
        let notification = Notification {
            urgency: Some(request.urgency),
            context: request.context.clone().filter(|c| !c.is_empty()),
            options: request.options().to_vec(),
            mention: self.config.slack.user_id.clone(),
            ..Notification::new(NotificationKind::Question, request.question.clone())
        };
        let message = OutgoingMessage::notification(request.question.clone(), notification);
        let channel = &self.config.slack.channel_id;

        match self.chat.post_message(channel, &message).await {
            Ok(posted) => match posted.message_id {
                Some(id) => Ok(ThreadRef::new(posted.channel, id)),
                None => {
                    error!("ask: post succeeded without a message id");
                    Err(AskError::PostFailed)
                }
            },
            Err(e) => {
                error!("ask: failed to post question: {e}");
                Err(AskError::PostFailed)
            }
        }
    }

    /// Best-effort thread notice.
    async fn notify(&self, thread: &ThreadRef, text: &str) {
        let message = OutgoingMessage::thread_reply(thread.root_id.clone(), text);
        if let Err(e) = self.chat.post_message(&thread.channel, &message).await {
            warn!("ask: failed to post thread notice: {e}");
        }
    }
}

fn build_response(reply: HumanReply, options: &[String], asked_at: Instant) -> ToolResponse {
    let selected = select_option(&reply.text, options);
    ToolResponse {
        selected_option: selected.map(|(_, opt)| opt.to_string()),
        selected_option_index: selected.map(|(idx, _)| idx),
        reply: reply.text,
        replied_by: reply.user.unwrap_or_else(|| "unknown".to_string()),
        response_time_ms: asked_at.elapsed().as_millis() as u64,
    }
}

/// Map a bare 1-based number in the reply to an option.
pub fn select_option<'a>(reply: &str, options: &'a [String]) -> Option<(usize, &'a str)> {
    let trimmed = reply.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = trimmed.parse::<usize>().ok()?.checked_sub(1)?;
    options.get(index).map(|opt| (index, opt.as_str()))
}
