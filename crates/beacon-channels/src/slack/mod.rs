//! Slack Web API channel.
//!
//! Posts with `chat.postMessage` and reads thread replies with
//! `conversations.replies`. Docs: <https://api.slack.com/methods>

mod blocks;
mod replies;
mod send;
pub(crate) mod types;


pub use blocks::render_attachments;

use beacon_core::config::SlackConfig;

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack channel using a bot token.
pub struct SlackClient {
    config: SlackConfig,
    client: reqwest::Client,
    base_url: String,
}

impl SlackClient {
    /// Create a new Slack client from config.
    pub fn new(config: SlackConfig) -> Self {
        Self::with_base_url(config, SLACK_API_BASE)
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(config: SlackConfig, base_url: &str) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The configured notification channel.
    pub fn channel_id(&self) -> &str {
        &self.config.channel_id
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}
