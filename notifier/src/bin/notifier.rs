//! Headless notifier binary.
//!
//! Without a subcommand it runs the notifier with a renderer that logs every
//! window operation. Subcommands inspect and edit the stored settings.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use whiteboard_notifier::shutdown::{ShutdownSignal, wait_for_signal};
use whiteboard_notifier::{AppShell, ClientConfig, SettingsManager, TracingRenderer};

#[derive(Debug, Parser)]
#[command(name = "whiteboard-notifier", about = "Whiteboard desktop notifier", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the notifier (default).
    Run,
    /// Print all settings as JSON, secrets masked.
    Settings,
    /// Store one setting.
    Set { key: String, value: String },
    /// Store the credentials from a dlass://config/... link.
    Link { url: String },
    /// Send one heartbeat with the stored settings.
    Test,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let (db, config, dir) = whiteboard_notifier::init_foundation()?;
    tracing::debug!("Data directory: {}", dir.display());
    let sm = SettingsManager::new(db);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(sm).await,
        Command::Settings => {
            let masked: Vec<_> = sm.get_all_settings()?.values().map(|s| s.masked()).collect();
            println!("{}", serde_json::to_string_pretty(&masked)?);
            Ok(())
        }
        Command::Set { key, value } => {
            sm.set_setting(&key, &value)?;
            println!("{key} updated");
            Ok(())
        }
        Command::Link { url } => {
            let link = sm.apply_config_link(&url)?;
            println!("Board {} configured", link.board_id);
            Ok(())
        }
        Command::Test => test(&config).await,
    }
}

async fn run(sm: SettingsManager) -> anyhow::Result<()> {
    tracing::info!("Starting whiteboard notifier (headless mode)");
    let mut shell = AppShell::start(sm, Box::new(TracingRenderer::new())).await?;

    let status = shell.settings().check_feature_status()?;
    if !status.board_configured {
        tracing::warn!(
            missing = ?status.missing_settings,
            "Board is not configured; set it and send SIGHUP to reload"
        );
    }
    tracing::info!("Notifier running. Press Ctrl+C to stop.");

    loop {
        match wait_for_signal().await {
            ShutdownSignal::Reload => {
                if let Err(e) = shell.reconfigure().await {
                    tracing::error!("Reload failed: {e}");
                }
            }
            ShutdownSignal::Terminate => break,
        }
    }

    tracing::info!("Shutting down...");
    shell.shutdown().await;
    Ok(())
}

async fn test(config: &ClientConfig) -> anyhow::Result<()> {
    match AppShell::test_connection(config).await {
        Ok(status) if status.success => {
            println!("Connection OK: {}", status.message);
            Ok(())
        }
        Ok(status) => anyhow::bail!("board refused heartbeat: {}", status.message),
        Err(e) => anyhow::bail!("connection failed: {e}"),
    }
}
