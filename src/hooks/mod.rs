//! Lifecycle event router and the fire-and-forget notifiers.
//!
//! Nothing in here returns an error: every failure is logged and swallowed
//! so the hook pipeline is never blocked or broken.

mod failure;
mod permission;
mod stop;


use beacon_core::{
    config::Config,
    event::LifecycleEvent,
    message::{Notification, OutgoingMessage, PostedMessage},
    traits::ChatClient,
};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, warn};

/// Starts the detached terminal watcher for a freshly posted thread.
pub trait WatcherLauncher: Send + Sync {
    fn launch(&self, transcript_path: &str, thread_id: &str, channel_id: &str);
}

/// Re-executes the current binary as `beacon watch ...`, detached with null stdio.
pub struct ProcessLauncher {
    config_path: String,
}

impl ProcessLauncher {
    pub fn new(config_path: impl Into<String>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub(crate) fn command(
        &self,
        exe: PathBuf,
        transcript: &str,
        thread: &str,
        channel: &str,
    ) -> Command {
        let mut cmd = Command::new(exe);
        cmd.arg("--config")
            .arg(&self.config_path)
            .arg("watch")
            .arg(transcript)
            .arg(thread)
            .arg(channel)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group so the hook's exit does not take the watcher down.
            cmd.process_group(0);
        }
        cmd
    }
}

impl WatcherLauncher for ProcessLauncher {
    fn launch(&self, transcript_path: &str, thread_id: &str, channel_id: &str) {
        let exe = match std::env::current_exe() {
            Ok(exe) => exe,
            Err(e) => {
                warn!("hook: cannot locate own executable for watcher: {e}");
                return;
            }
        };
        match self
            .command(exe, transcript_path, thread_id, channel_id)
            .spawn()
        {
            Ok(child) => debug!("hook: watcher started (pid {})", child.id()),
            Err(e) => warn!("hook: failed to spawn watcher: {e}"),
        }
    }
}

/// Everything a notifier needs.
pub struct HookContext {
    pub chat: Arc<dyn ChatClient>,
    pub config: Arc<Config>,
    pub launcher: Arc<dyn WatcherLauncher>,
}

impl HookContext {
    fn mention(&self) -> Option<String> {
        self.config.slack.user_id.clone()
    }

    /// One post to the configured channel. Failures are logged, not returned.
    async fn post(&self, text: String, notification: Notification) -> Option<PostedMessage> {
        let label = notification.kind.label();
        let message = OutgoingMessage::notification(text, notification);
        match self
            .chat
            .post_message(&self.config.slack.channel_id, &message)
            .await
        {
            Ok(posted) => Some(posted),
            Err(e) => {
                warn!("hook: failed to post {label} notification via {}: {e}", self.chat.name());
                None
            }
        }
    }
}

/// Dispatch one lifecycle event to its notifier.
pub async fn route(event: LifecycleEvent, ctx: &HookContext) {
    match event {
        LifecycleEvent::Stopped(ev) => stop::notify(&ev, ctx).await,
        LifecycleEvent::ToolFailed(ev) => failure::notify(&ev, ctx).await,
        LifecycleEvent::PermissionRequested(ev) => permission::notify(&ev, ctx).await,
        LifecycleEvent::Unknown => debug!("hook: ignoring unhandled event kind"),
    }
}
