//! `beacon status` and `beacon test`.

use beacon_core::{
    config::{self, Config},
    error::BeaconError,
    message::{Notification, NotificationKind, OutgoingMessage, PostedMessage},
    traits::ChatClient,
};
use std::path::Path;

/// Token preview safe to print: the first 8 characters only.
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return "not set".to_string();
    }
    let prefix: String = token.chars().take(8).collect();
    format!("set ({prefix}...)")
}

/// Print the resolved configuration and whether it would pass validation.
pub fn status(config_path: &str) -> anyhow::Result<()> {
    cliclack::intro(console::style("beacon status").bold().to_string())?;

    let expanded = config::shellexpand(config_path);
    if Path::new(&expanded).exists() {
        cliclack::log::success(format!("Config file: {expanded}"))?;
    } else {
        cliclack::log::warning(format!(
            "Config file: {expanded} not found (defaults + environment)"
        ))?;
    }

    let mut cfg = match config::load_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            cliclack::log::error(e.to_string())?;
            cliclack::outro("Configuration has errors")?;
            return Ok(());
        }
    };
    let invalid = cfg.apply_env_overrides(|name| std::env::var(name).ok());

    cliclack::log::info(format!(
        "Slack\n  bot_token  : {}\n  channel_id : {}\n  user_id    : {}",
        mask_token(&cfg.slack.bot_token),
        non_empty_or(&cfg.slack.channel_id, "not set"),
        cfg.slack.user_id.as_deref().unwrap_or("not set"),
    ))?;
    cliclack::log::info(format!(
        "Timing\n  send_delay_ms        : {}\n  poll_timeout_ms      : {}\n  hook_idle_timeout_ms : {}",
        cfg.timing.send_delay_ms, cfg.timing.poll_timeout_ms, cfg.timing.hook_idle_timeout_ms,
    ))?;
    cliclack::log::info(format!("Watcher log: {}", cfg.log_dir().display()))?;

    for name in &invalid {
        cliclack::log::error(format!("{name} must be a non-negative integer"))?;
    }
    match cfg.validate() {
        Ok(()) if invalid.is_empty() => {
            cliclack::outro("Configuration valid. Run `beacon test` to check Slack connectivity.")?
        }
        Ok(()) => cliclack::outro("Configuration has errors")?,
        Err(e) => {
            cliclack::log::error(e.to_string())?;
            cliclack::outro("Configuration has errors")?;
        }
    }
    Ok(())
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// The message `beacon test` posts.
pub fn test_message(cfg: &Config) -> OutgoingMessage {
    let sent_at = chrono::Local::now().format("%Y-%m-%d %H:%M %Z");
    let notification = Notification::new(
        NotificationKind::Completed,
        "Beacon test notification: your setup is working! :tada:",
    )
    .with_body(Some(format!(
        "Beacon will notify you here when Claude needs your input.\nSent {sent_at}."
    )))
    .with_mention(cfg.slack.user_id.clone());
    OutgoingMessage::notification("Beacon test notification: your setup is working!", notification)
}

/// Post the test notification to the configured channel.
pub async fn send_test(chat: &dyn ChatClient, cfg: &Config) -> Result<PostedMessage, BeaconError> {
    chat.post_message(&cfg.slack.channel_id, &test_message(cfg))
        .await
}

/// `beacon test`: post, then report the outcome on the terminal.
pub async fn run_test(chat: &dyn ChatClient, cfg: &Config) -> anyhow::Result<()> {
    cliclack::intro(console::style("beacon test").bold().to_string())?;
    match send_test(chat, cfg).await {
        Ok(_) => {
            cliclack::log::success(format!(
                "Test notification sent to {}",
                cfg.slack.channel_id
            ))?;
            cliclack::outro("Check your channel")?;
            Ok(())
        }
        Err(e) => {
            cliclack::log::error(format!("Failed to send test notification: {e}"))?;
            cliclack::log::info(
                "Check that bot_token is valid, the bot has the chat:write scope, \
                 and the bot is a member of the channel",
            )?;
            cliclack::outro_cancel("Test failed")?;
            anyhow::bail!("test notification failed")
        }
    }
}
