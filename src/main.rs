mod ask;
mod commands;
mod hooks;
mod mcp;
mod poller;
mod reply;
#[cfg(test)]
mod testing;
mod watcher;

use anyhow::Context as _;
use ask::AskHuman;
use beacon_channels::slack::SlackClient;
use beacon_core::{
    config::{self, Config, DEFAULT_CONFIG_PATH},
    event::LifecycleEvent,
    message::ThreadRef,
};
use clap::{Parser, Subcommand};
use hooks::{HookContext, ProcessLauncher};
use mcp::ToolServer;
use poller::BackoffPoller;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use watcher::{WatchOptions, Watcher};

#[derive(Parser)]
#[command(
    name = "beacon",
    version,
    about = "Slack notifications and human-in-the-loop answers for terminal coding assistants"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, global = true, env = "BEACON_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stdio tool server exposing ask_human_via_slack.
    Serve,
    /// Handle one lifecycle event read from stdin.
    Hook,
    /// Watch a transcript for a terminal answer (started by `hook`).
    Watch {
        transcript: Option<String>,
        thread_id: Option<String>,
        channel_id: Option<String>,
    },
    /// Show the resolved configuration.
    Status,
    /// Post a test notification to the configured channel.
    Test,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            init_stderr_logging(&cli.config);
            serve(&cli.config).await?;
        }
        Commands::Hook => {
            init_stderr_logging(&cli.config);
            handle_hook(&cli.config).await;
        }
        Commands::Watch {
            transcript,
            thread_id,
            channel_id,
        } => return Ok(watch(&cli.config, transcript, thread_id, channel_id).await),
        Commands::Status => commands::status(&cli.config)?,
        Commands::Test => {
            init_stderr_logging(&cli.config);
            let cfg = config::load(&cli.config)?;
            let slack = SlackClient::new(cfg.slack.clone());
            commands::run_test(&slack, &cfg).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Resolve the bot identity, then serve JSON-RPC on stdin/stdout.
async fn serve(config_path: &str) -> anyhow::Result<()> {
    let cfg = config::load(config_path)?;
    let slack = Arc::new(SlackClient::new(cfg.slack.clone()));
    let bot_user_id = slack
        .resolve_bot_user_id()
        .await
        .context("cannot verify Slack bot token")?;
    info!("serve: authenticated as {bot_user_id}");

    let poller = BackoffPoller::new(slack.clone(), bot_user_id);
    let ask = AskHuman::new(slack, Arc::new(poller), Arc::new(cfg));
    let server = ToolServer::new(ask);

    info!("serve: beacon tool server started");
    server
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;
    Ok(())
}

/// Never fails: a broken event or config leaves the hook pipeline untouched.
async fn handle_hook(config_path: &str) {
    let mut raw = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut raw).await {
        warn!("hook: failed to read stdin: {e}");
        return;
    }
    let event = match LifecycleEvent::parse(&raw) {
        Ok(event) => event,
        Err(e) => {
            warn!("hook: ignoring malformed event: {e}");
            return;
        }
    };
    let cfg = match config::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("hook: {e}");
            return;
        }
    };

    info!("hook: {} event", event.kind());
    let ctx = HookContext {
        chat: Arc::new(SlackClient::new(cfg.slack.clone())),
        config: Arc::new(cfg),
        launcher: Arc::new(ProcessLauncher::new(config_path)),
    };
    hooks::route(event, &ctx).await;
}

/// Detached watcher process. Exits 1 only when its arguments are missing.
async fn watch(
    config_path: &str,
    transcript: Option<String>,
    thread_id: Option<String>,
    channel_id: Option<String>,
) -> ExitCode {
    let loaded = config::load(config_path);
    let fallback = Config::default();
    let log_cfg = loaded.as_ref().unwrap_or(&fallback);
    let _guard = init_file_logging(&log_cfg.log_dir(), &log_cfg.beacon.log_level);

    let (Some(transcript), Some(thread_id), Some(channel_id)) = (transcript, thread_id, channel_id)
    else {
        error!("watcher: missing required arguments <transcript> <thread_id> <channel_id>");
        return ExitCode::from(1);
    };
    let cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("watcher: {e}");
            return ExitCode::SUCCESS;
        }
    };

    let slack = SlackClient::new(cfg.slack.clone());
    let options = WatchOptions::new(cfg.timing.hook_idle_timeout());
    let outcome = Watcher::new(
        transcript,
        ThreadRef::new(channel_id, thread_id),
        &slack,
        options,
    )
    .run()
    .await;
    info!("watcher: finished ({outcome:?})");
    ExitCode::SUCCESS
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Logs go to stderr; stdout belongs to the JSON-RPC transport.
fn init_stderr_logging(config_path: &str) {
    let level = config::load_file(config_path)
        .map(|cfg| cfg.beacon.log_level)
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&level))
        .with_writer(std::io::stderr)
        .init();
}

/// The watcher has no console, so it logs to `{data_dir}/logs/watcher.log`.
/// Logging stays off if the file cannot be opened.
fn init_file_logging(dir: &Path, level: &str) -> Option<WorkerGuard> {
    std::fs::create_dir_all(dir).ok()?;
    let appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::NEVER)
        .filename_prefix("watcher.log")
        .build(dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_watcher_command_parses_as_watch_subcommand() {
        let cmd = ProcessLauncher::new("/tmp/beacon.toml").command(
            PathBuf::from("beacon"),
            "/tmp/session.jsonl",
            "1700000000.000100",
            "C0WATCH",
        );
        let argv = std::iter::once(cmd.get_program().to_os_string())
            .chain(cmd.get_args().map(|a| a.to_os_string()));
        let cli = Cli::try_parse_from(argv).unwrap();

        assert_eq!(cli.config, "/tmp/beacon.toml");
        let Commands::Watch {
            transcript,
            thread_id,
            channel_id,
        } = cli.command
        else {
            panic!("launcher argv did not parse as `watch`");
        };
        assert_eq!(transcript.as_deref(), Some("/tmp/session.jsonl"));
        assert_eq!(thread_id.as_deref(), Some("1700000000.000100"));
        assert_eq!(channel_id.as_deref(), Some("C0WATCH"));
    }
}
