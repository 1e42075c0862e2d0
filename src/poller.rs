//! Thread polling with full-jitter exponential backoff.
//!
//! One call covers one wait window: poll until a substantive human reply
//! shows up or the deadline passes. Fetch errors never end the window.

use crate::reply::is_substantive_reply;
use async_trait::async_trait;
use beacon_core::{
    message::{HumanReply, PollResult, ThreadMessage, ThreadRef},
    text::preview,
    traits::ChatClient,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Messages requested per fetch.
const FETCH_LIMIT: usize = 10;

/// Backoff tuning.
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(3_000),
            max_delay: Duration::from_millis(15_000),
            multiplier: 1.5,
        }
    }
}

/// Growing base delay; each sleep is drawn uniformly from `[0, base]`.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    base: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    pub(crate) fn new(options: &PollOptions) -> Self {
        Self {
            base: options.initial_delay.min(options.max_delay),
            max: options.max_delay,
            multiplier: options.multiplier.max(1.0),
        }
    }

    pub(crate) fn base(&self) -> Duration {
        self.base
    }

    pub(crate) fn jittered(&self) -> Duration {
        let ceiling = self.base().as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
    }

    pub(crate) fn grow(&mut self) {
        self.base = self.base.mul_f64(self.multiplier).min(self.max);
    }
}

/// Waits for a human reply in a thread. The protocol depends on this seam.
#[async_trait]
pub trait ReplyWaiter: Send + Sync {
    async fn wait_for_reply(&self, thread: &ThreadRef, timeout: Duration) -> PollResult;
}

/// The production waiter: polls the chat client with backoff.
pub struct BackoffPoller {
    chat: Arc<dyn ChatClient>,
    /// The bot's own user id; its posts are never replies.
    self_id: String,
    options: PollOptions,
}

impl BackoffPoller {
    pub fn new(chat: Arc<dyn ChatClient>, self_id: impl Into<String>) -> Self {
        Self::with_options(chat, self_id, PollOptions::default())
    }

    pub fn with_options(
        chat: Arc<dyn ChatClient>,
        self_id: impl Into<String>,
        options: PollOptions,
    ) -> Self {
        Self {
            chat,
            self_id: self_id.into(),
            options,
        }
    }

    /// Poll `thread` until a substantive reply arrives or `timeout` elapses.
    pub async fn poll_for_reply(&self, thread: &ThreadRef, timeout: Duration) -> PollResult {
        let start = Instant::now();
        let deadline = start + timeout;
        let mut backoff = Backoff::new(&self.options);

        while Instant::now() < deadline {
            tokio::time::sleep(backoff.jittered()).await;
            if Instant::now() >= deadline {
                break;
            }

            match self.chat.fetch_thread_replies(thread, FETCH_LIMIT).await {
                Ok(messages) => {
                    if let Some(reply) = self.first_reply(thread, messages) {
                        return PollResult {
                            reply: Some(reply),
                            elapsed_ms: elapsed_ms(start),
                        };
                    }
                }
                Err(e) => warn!("poll: failed to fetch replies for {}: {e}", thread.root_id),
            }

            backoff.grow();
        }

        PollResult {
            reply: None,
            elapsed_ms: elapsed_ms(start),
        }
    }

    /// First message in fetch order that a human wrote and that says something.
    fn first_reply(&self, thread: &ThreadRef, messages: Vec<ThreadMessage>) -> Option<HumanReply> {
        for msg in messages {
            if msg.id == thread.root_id || msg.is_bot() {
                continue;
            }
            if msg.user.as_deref() == Some(self.self_id.as_str()) {
                continue;
            }
            let Some(text) = msg.text else {
                continue;
            };
            if !is_substantive_reply(&text) {
                debug!("poll: skipping non-substantive reply: {:?}", preview(&text, 50));
                continue;
            }
            return Some(HumanReply {
                text,
                user: msg.user,
                message_id: msg.id,
            });
        }
        None
    }
}

#[async_trait]
impl ReplyWaiter for BackoffPoller {
    async fn wait_for_reply(&self, thread: &ThreadRef, timeout: Duration) -> PollResult {
        self.poll_for_reply(thread, timeout).await
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
