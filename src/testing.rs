//! Test doubles shared by the poller, protocol, hook, and watcher tests.

use crate::poller::ReplyWaiter;
use async_trait::async_trait;
use beacon_core::{
    error::BeaconError,
    message::{OutgoingMessage, PollResult, PostedMessage, ThreadMessage, ThreadRef},
    traits::ChatClient,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every post and replays scripted fetch batches.
///
/// Once the script runs out, fetches return an empty batch.
#[derive(Default)]
pub struct RecordingChat {
    pub posts: Mutex<Vec<(String, OutgoingMessage)>>,
    fetches: Mutex<VecDeque<Result<Vec<ThreadMessage>, BeaconError>>>,
    pub fetch_count: AtomicUsize,
    /// Posts with this index (0-based) fail.
    fail_posts: Mutex<Vec<usize>>,
    /// Posts succeed but carry no message id.
    pub omit_message_id: bool,
    /// Simulated round trip for every post.
    post_delay: Duration,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetches(batches: Vec<Result<Vec<ThreadMessage>, BeaconError>>) -> Self {
        let chat = Self::new();
        *chat.fetches.lock().unwrap() = batches.into();
        chat
    }

    pub fn failing_posts(self, indexes: &[usize]) -> Self {
        *self.fail_posts.lock().unwrap() = indexes.to_vec();
        self
    }

    pub fn without_message_ids(mut self) -> Self {
        self.omit_message_id = true;
        self
    }

    pub fn with_post_delay(mut self, delay: Duration) -> Self {
        self.post_delay = delay;
        self
    }

    pub fn texts(&self) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.text.clone())
            .collect()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    fn name(&self) -> &str {
        "recording"
    }

    async fn post_message(
        &self,
        channel: &str,
        message: &OutgoingMessage,
    ) -> Result<PostedMessage, BeaconError> {
        if !self.post_delay.is_zero() {
            tokio::time::sleep(self.post_delay).await;
        }
        let mut posts = self.posts.lock().unwrap();
        let index = posts.len();
        posts.push((channel.to_string(), message.clone()));
        if self.fail_posts.lock().unwrap().contains(&index) {
            return Err(BeaconError::Chat("slack chat.postMessage failed: ratelimited".into()));
        }
        Ok(PostedMessage {
            channel: channel.to_string(),
            message_id: (!self.omit_message_id).then(|| format!("1700000000.{index:06}")),
        })
    }

    async fn fetch_thread_replies(
        &self,
        _thread: &ThreadRef,
        _limit: usize,
    ) -> Result<Vec<ThreadMessage>, BeaconError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.fetches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// A human-authored thread message.
pub fn human(id: &str, user: &str, text: &str) -> ThreadMessage {
    ThreadMessage {
        id: id.to_string(),
        text: Some(text.to_string()),
        user: Some(user.to_string()),
        kind: Some("message".to_string()),
        ..Default::default()
    }
}

/// Hands out pre-baked poll results, one per window.
///
/// Once the script runs out, every window comes back empty.
pub struct ScriptedWaiter {
    results: Mutex<VecDeque<PollResult>>,
    pub calls: Mutex<Vec<(ThreadRef, Duration)>>,
}

impl ScriptedWaiter {
    pub fn new(results: Vec<PollResult>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ReplyWaiter for ScriptedWaiter {
    async fn wait_for_reply(&self, thread: &ThreadRef, timeout: Duration) -> PollResult {
        self.calls.lock().unwrap().push((thread.clone(), timeout));
        self.results.lock().unwrap().pop_front().unwrap_or(PollResult {
            reply: None,
            elapsed_ms: timeout.as_millis() as u64,
        })
    }
}
