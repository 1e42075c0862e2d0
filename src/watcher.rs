//! Terminal-race watcher.
//!
//! Runs as its own detached process after a permission notice is posted.
//! If the operator answers in the terminal instead of in chat, the transcript
//! grows a user line and the thread gets a "resolved in terminal" marker.

use beacon_core::{
    message::{OutgoingMessage, ThreadRef},
    traits::ChatClient,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

pub const RESOLVED_IN_TERMINAL_TEXT: &str =
    ":white_check_mark: Resolved in terminal — no action needed.";

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Delay between transcript reads.
    pub interval: Duration,
    /// Give up after this long without a user line.
    pub idle_timeout: Duration,
}

impl WatchOptions {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            interval: Duration::from_secs(5),
            idle_timeout,
        }
    }
}

/// How a watch ended. Every outcome is a graceful exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// A user line appeared; the marker post was attempted.
    Resolved,
    IdleTimeout,
    /// The transcript could not be read at start or disappeared later.
    Unreadable,
}

pub struct Watcher<'a> {
    transcript: PathBuf,
    thread: ThreadRef,
    chat: &'a dyn ChatClient,
    options: WatchOptions,
}

impl<'a> Watcher<'a> {
    pub fn new(
        transcript: impl Into<PathBuf>,
        thread: ThreadRef,
        chat: &'a dyn ChatClient,
        options: WatchOptions,
    ) -> Self {
        Self {
            transcript: transcript.into(),
            thread,
            chat,
            options,
        }
    }

    pub async fn run(&self) -> WatchOutcome {
        let Some(initial) = read_transcript(&self.transcript).await else {
            return WatchOutcome::Unreadable;
        };
        let baseline = non_empty_lines(&initial);
        let seen = initial.lines().count();
        info!(
            "watcher: started on {} (thread {}, {baseline} lines)",
            self.transcript.display(),
            self.thread.root_id
        );

        let deadline = Instant::now() + self.options.idle_timeout;
        while Instant::now() < deadline {
            tokio::time::sleep(self.options.interval).await;

            let Some(current) = read_transcript(&self.transcript).await else {
                return WatchOutcome::Unreadable;
            };
            if non_empty_lines(&current) <= baseline {
                continue;
            }
            if current.lines().skip(seen).any(is_user_line) {
                info!("watcher: terminal response detected");
                self.post_resolved().await;
                return WatchOutcome::Resolved;
            }
        }

        info!(
            "watcher: no terminal response after {}ms",
            self.options.idle_timeout.as_millis()
        );
        WatchOutcome::IdleTimeout
    }

    async fn post_resolved(&self) {
        let message = OutgoingMessage::thread_reply(
            self.thread.root_id.clone(),
            RESOLVED_IN_TERMINAL_TEXT,
        );
        if let Err(e) = self.chat.post_message(&self.thread.channel, &message).await {
            warn!("watcher: failed to post resolved marker: {e}");
        }
    }
}

async fn read_transcript(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            info!("watcher: transcript {} not readable: {e}", path.display());
            None
        }
    }
}

fn non_empty_lines(content: &str) -> usize {
    content.lines().filter(|l| !l.trim().is_empty()).count()
}

/// A transcript record authored by the operator. Malformed lines never match.
fn is_user_line(line: &str) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    let Ok(record) = serde_json::from_str::<Value>(line) else {
        return false;
    };
    let is_human = |v: Option<&Value>| matches!(v.and_then(Value::as_str), Some("user" | "human"));
    is_human(record.get("role"))
        || is_human(record.get("type"))
        || is_human(record.pointer("/message/role"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingChat;
    use std::io::Write;

    fn transcript(name: &str, lines: &[&str]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "beacon_watcher_{name}_{}.jsonl",
            std::process::id()
        ));
        let mut content = lines.join("\n");
        content.push('\n');
        std::fs::write(&path, content).unwrap();
        path
    }

    fn append(path: &Path, line: &str) {
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        writeln!(file, "{line}").unwrap();
    }

    fn options(idle_ms: u64) -> WatchOptions {
        WatchOptions {
            interval: Duration::from_millis(20),
            idle_timeout: Duration::from_millis(idle_ms),
        }
    }

    fn thread() -> ThreadRef {
        ThreadRef::new("C0WATCH", "1700000000.000100")
    }

    #[test]
    fn test_user_line_detection() {
        assert!(is_user_line(r#"{"role": "user", "content": "yes"}"#));
        assert!(is_user_line(r#"{"role": "human"}"#));
        assert!(is_user_line(r#"{"type": "user", "message": {"content": "ok"}}"#));
        assert!(is_user_line(r#"{"type": "x", "message": {"role": "user"}}"#));
        assert!(!is_user_line(r#"{"role": "assistant"}"#));
        assert!(!is_user_line(r#"{"type": "summary"}"#));
        assert!(!is_user_line("not json {"));
        assert!(!is_user_line("   "));
    }

    #[test]
    fn test_non_empty_line_count() {
        assert_eq!(non_empty_lines("a\n\n  \nb\n"), 2);
        assert_eq!(non_empty_lines(""), 0);
    }

    #[tokio::test]
    async fn test_posts_once_when_user_line_appended() {
        let path = transcript(
            "resolved",
            &[r#"{"role":"assistant","content":"May I?"}"#, r#"{"type":"summary"}"#],
        );
        let chat = RecordingChat::new();

        let writer = {
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(60)).await;
                append(&path, r#"{"role":"user","content":"yes, go ahead"}"#);
            })
        };

        let started = Instant::now();
        let outcome = Watcher::new(&path, thread(), &chat, options(5_000)).run().await;
        writer.await.unwrap();

        assert_eq!(outcome, WatchOutcome::Resolved);
        assert!(started.elapsed() < Duration::from_millis(5_000));
        assert_eq!(chat.texts(), vec![RESOLVED_IN_TERMINAL_TEXT]);
        let posts = chat.posts.lock().unwrap();
        assert_eq!(posts[0].0, "C0WATCH");
        assert_eq!(posts[0].1.thread_id.as_deref(), Some("1700000000.000100"));
        drop(posts);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_idle_timeout_posts_nothing() {
        let path = transcript("idle", &[r#"{"role":"assistant"}"#]);
        let chat = RecordingChat::new();

        append(&path, r#"{"role":"assistant","content":"still working"}"#);
        append(&path, "garbage line");
        let outcome = Watcher::new(&path, thread(), &chat, options(150)).run().await;

        assert_eq!(outcome, WatchOutcome::IdleTimeout);
        assert_eq!(chat.post_count(), 0);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_user_lines_before_start_are_ignored() {
        let path = transcript("baseline", &[r#"{"role":"user","content":"earlier"}"#]);
        let chat = RecordingChat::new();
        let outcome = Watcher::new(&path, thread(), &chat, options(100)).run().await;
        assert_eq!(outcome, WatchOutcome::IdleTimeout);
        assert_eq!(chat.post_count(), 0);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_missing_transcript_is_unreadable() {
        let chat = RecordingChat::new();
        let outcome = Watcher::new(
            "/nonexistent/beacon/transcript.jsonl",
            thread(),
            &chat,
            options(1_000),
        )
        .run()
        .await;
        assert_eq!(outcome, WatchOutcome::Unreadable);
        assert_eq!(chat.post_count(), 0);
    }

    #[tokio::test]
    async fn test_transcript_removed_mid_watch() {
        let path = transcript("removed", &[r#"{"role":"assistant"}"#]);
        let chat = RecordingChat::new();
        let remover = {
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                std::fs::remove_file(&path).unwrap();
            })
        };
        let outcome = Watcher::new(&path, thread(), &chat, options(5_000)).run().await;
        remover.await.unwrap();
        assert_eq!(outcome, WatchOutcome::Unreadable);
    }

    #[tokio::test]
    async fn test_post_failure_still_resolves() {
        let path = transcript("postfail", &[r#"{"role":"assistant"}"#]);
        let chat = RecordingChat::new().failing_posts(&[0]);
        append(&path, r#"{"role":"user","content":"done here"}"#);
        // Appended before start, so it is part of the baseline.
        let outcome = Watcher::new(&path, thread(), &chat, options(100)).run().await;
        assert_eq!(outcome, WatchOutcome::IdleTimeout);

        let writer = {
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                append(&path, r#"{"role":"human"}"#);
            })
        };
        let outcome = Watcher::new(&path, thread(), &chat, options(5_000)).run().await;
        writer.await.unwrap();
        assert_eq!(outcome, WatchOutcome::Resolved);
        assert_eq!(chat.post_count(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
