//! Message posting and token identity.

use super::blocks::render_attachments;
use super::types::{AuthTestBody, PostMessageBody, SlackResponse};
use super::SlackClient;
use beacon_core::{
    error::BeaconError,
    message::{OutgoingMessage, PostedMessage},
};
use tracing::debug;

impl SlackClient {
    /// Build the `chat.postMessage` payload for a message.
    pub(crate) fn post_payload(channel: &str, message: &OutgoingMessage) -> serde_json::Value {
        let mut body = serde_json::json!({
            "channel": channel,
            "text": message.text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(ref thread_id) = message.thread_id {
            body["thread_ts"] = serde_json::Value::String(thread_id.clone());
        }
        if let Some(ref notification) = message.notification {
            body["attachments"] = render_attachments(notification);
        }
        body
    }

    /// Post a message and return the new message's `ts`.
    pub(crate) async fn send_message(
        &self,
        channel: &str,
        message: &OutgoingMessage,
    ) -> Result<PostedMessage, BeaconError> {
        let body = Self::post_payload(channel, message);

        let resp: SlackResponse<PostMessageBody> = self
            .client
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(&self.config.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BeaconError::Chat(format!("slack chat.postMessage failed: {e}")))?
            .json()
            .await
            .map_err(|e| BeaconError::Chat(format!("slack chat.postMessage parse failed: {e}")))?;

        if !resp.ok {
            return Err(BeaconError::Chat(format!(
                "slack chat.postMessage failed: {}",
                resp.error_code()
            )));
        }

        debug!(
            "slack: posted to {channel} (ts: {})",
            resp.body.ts.as_deref().unwrap_or("-")
        );
        Ok(PostedMessage {
            channel: resp.body.channel.unwrap_or_else(|| channel.to_string()),
            message_id: resp.body.ts.filter(|ts| !ts.is_empty()),
        })
    }

    /// Resolve the bot's own user id with `auth.test`.
    ///
    /// Also proves the token is valid. The poller needs this id to skip
    /// the bot's own thread posts.
    pub async fn resolve_bot_user_id(&self) -> Result<String, BeaconError> {
        let resp: SlackResponse<AuthTestBody> = self
            .client
            .post(self.method_url("auth.test"))
            .bearer_auth(&self.config.bot_token)
            .send()
            .await
            .map_err(|e| BeaconError::Chat(format!("slack auth.test failed: {e}")))?
            .json()
            .await
            .map_err(|e| BeaconError::Chat(format!("slack auth.test parse failed: {e}")))?;

        if !resp.ok {
            return Err(BeaconError::Chat(format!(
                "slack auth.test failed: {}",
                resp.error_code()
            )));
        }

        resp.body
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| BeaconError::Chat("slack auth.test returned no user_id".into()))
    }
}
