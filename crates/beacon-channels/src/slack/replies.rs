//! Thread reads and the `ChatClient` implementation.

use super::types::{RepliesBody, SlackResponse};
use super::SlackClient;
use async_trait::async_trait;
use beacon_core::{
    error::BeaconError,
    message::{OutgoingMessage, PostedMessage, ThreadMessage, ThreadRef},
    traits::ChatClient,
};

#[async_trait]
impl ChatClient for SlackClient {
    fn name(&self) -> &str {
        "slack"
    }

    async fn post_message(
        &self,
        channel: &str,
        message: &OutgoingMessage,
    ) -> Result<PostedMessage, BeaconError> {
        self.send_message(channel, message).await
    }

    async fn fetch_thread_replies(
        &self,
        thread: &ThreadRef,
        limit: usize,
    ) -> Result<Vec<ThreadMessage>, BeaconError> {
        let limit = limit.to_string();
        let resp: SlackResponse<RepliesBody> = self
            .client
            .get(self.method_url("conversations.replies"))
            .bearer_auth(&self.config.bot_token)
            .query(&[
                ("channel", thread.channel.as_str()),
                ("ts", thread.root_id.as_str()),
                ("oldest", thread.root_id.as_str()),
                ("inclusive", "false"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BeaconError::Chat(format!("slack conversations.replies failed: {e}")))?
            .json()
            .await
            .map_err(|e| {
                BeaconError::Chat(format!("slack conversations.replies parse failed: {e}"))
            })?;

        if !resp.ok {
            return Err(BeaconError::Chat(format!(
                "slack conversations.replies failed: {}",
                resp.error_code()
            )));
        }

        Ok(resp.body.messages.into_iter().map(Into::into).collect())
    }
}
