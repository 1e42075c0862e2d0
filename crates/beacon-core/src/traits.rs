use crate::{
    error::BeaconError,
    message::{OutgoingMessage, PostedMessage, ThreadMessage, ThreadRef},
};
use async_trait::async_trait;

/// Chat platform capability.
///
/// The Slack client implements this; tests substitute a recording double.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Human-readable platform name.
    fn name(&self) -> &str;

    /// Post a message to `channel`, optionally inside a thread.
    async fn post_message(
        &self,
        channel: &str,
        message: &OutgoingMessage,
    ) -> Result<PostedMessage, BeaconError>;

    /// Messages posted in `thread` after its root, oldest first.
    async fn fetch_thread_replies(
        &self,
        thread: &ThreadRef,
        limit: usize,
    ) -> Result<Vec<ThreadMessage>, BeaconError>;
}
