mod defaults;


use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::BeaconError;
use defaults::*;

/// Default location of the config file.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/beacon/config.toml";

/// Top-level Beacon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub beacon: BeaconConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

/// Slack credentials and routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub channel_id: String,
    /// User to @mention in notifications. `None` = no mention.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Delays and wait windows, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Fixed delay before posting a question.
    #[serde(default)]
    pub send_delay_ms: u64,
    /// Length of one reply wait window.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// How long the terminal watcher waits for in-terminal activity.
    #[serde(default = "default_hook_idle_timeout_ms")]
    pub hook_idle_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            send_delay_ms: 0,
            poll_timeout_ms: default_poll_timeout_ms(),
            hook_idle_timeout_ms: default_hook_idle_timeout_ms(),
        }
    }
}

impl TimingConfig {
    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn hook_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.hook_idle_timeout_ms)
    }
}

impl Config {
    /// Apply environment overrides on top of file values.
    ///
    /// `lookup` is usually `std::env::var(..).ok()`; tests pass a map.
    /// Returns the names of numeric variables that failed to parse.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("SLACK_BOT_TOKEN") {
            self.slack.bot_token = token.trim().to_string();
        }
        if let Some(channel) = lookup("SLACK_CHANNEL_ID") {
            self.slack.channel_id = channel.trim().to_string();
        }
        if let Some(user) = lookup("SLACK_USER_ID") {
            let user = user.trim();
            self.slack.user_id = (!user.is_empty()).then(|| user.to_string());
        }

        let mut invalid = Vec::new();
        let numeric: [(&str, &mut u64); 3] = [
            ("SEND_DELAY_MS", &mut self.timing.send_delay_ms),
            ("POLL_TIMEOUT_MS", &mut self.timing.poll_timeout_ms),
            ("HOOK_IDLE_TIMEOUT_MS", &mut self.timing.hook_idle_timeout_ms),
        ];
        for (name, slot) in numeric {
            if let Some(raw) = lookup(name) {
                match raw.trim().parse::<u64>() {
                    Ok(value) => *slot = value,
                    Err(_) => invalid.push(name.to_string()),
                }
            }
        }
        invalid
    }

    /// Check credential shapes. Collects every problem into one error.
    pub fn validate(&self) -> Result<(), BeaconError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(BeaconError::Config(issues.join("; ")))
        }
    }

    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.slack.bot_token.starts_with("xoxb-") {
            issues.push("slack.bot_token must start with 'xoxb-'".to_string());
        }
        if !is_channel_id(&self.slack.channel_id) {
            issues.push(
                "slack.channel_id must be a public (C...) or private (G...) channel id".to_string(),
            );
        }
        issues
    }

    /// Directory for the watcher log file.
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.beacon.data_dir)).join("logs")
    }
}

/// Public channels start with `C`, private ones with `G`. DMs (`D...`) are rejected.
fn is_channel_id(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some('C') | Some('G'))
        && chars.next().is_some()
        && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load_file(path: &str) -> Result<Config, BeaconError> {
    let expanded = shellexpand(path);
    let path = Path::new(&expanded);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| BeaconError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| BeaconError::Config(format!("failed to parse config: {}", e)))
}

/// Load the file, apply process environment overrides, and validate.
pub fn load(path: &str) -> Result<Config, BeaconError> {
    let mut config = load_file(path)?;
    let invalid = config.apply_env_overrides(|name| std::env::var(name).ok());
    if !invalid.is_empty() {
        return Err(BeaconError::Config(format!(
            "{} must be a non-negative integer",
            invalid.join(", ")
        )));
    }
    config.validate()?;
    Ok(config)
}
