use std::path::PathBuf;

use board_store::Database;

use crate::config::{ClientConfig, SettingsManager};

const DATA_DIR_ENV: &str = "WHITEBOARD_NOTIFIER_DATA_DIR";
const CONFIG_LINK_ENV: &str = "CONFIG_LINK";
const DB_FILE: &str = "notifier.db";

/// Foundation init: environment, settings DB, config (fatal on error).
pub fn init_foundation() -> Result<(Database, ClientConfig, PathBuf), anyhow::Error> {
    load_dotenv();
    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;

    let db_path = dir.join(DB_FILE);
    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let sm = SettingsManager::new(db.clone());
    if let Err(e) = sm.migrate_from_env() {
        tracing::error!("Failed to migrate from env: {e}");
    }
    sm.initialize_defaults()?;
    apply_config_link_from_env(&sm);

    let config = ClientConfig::load(&sm)?;

    if let Ok(status) = sm.check_feature_status() {
        if !status.missing_settings.is_empty() {
            tracing::warn!(
                "Missing settings: {:?}, warnings: {:?}",
                status.missing_settings,
                status.warnings
            );
        }
    }

    tracing::info!(
        server = %config.server_address,
        board_id = %config.board_id,
        poll_secs = config.poll_interval.as_secs(),
        "Settings loaded"
    );
    Ok((db, config, dir))
}

/// Determine the data directory for the application.
/// Priority: WHITEBOARD_NOTIFIER_DATA_DIR env var > ~/.whiteboard-notifier
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".whiteboard-notifier")
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// A config link handed over at launch wins over stored credentials.
fn apply_config_link_from_env(sm: &SettingsManager) {
    let Ok(link) = std::env::var(CONFIG_LINK_ENV) else {
        return;
    };
    if link.trim().is_empty() {
        return;
    }
    if let Err(e) = sm.apply_config_link(&link) {
        tracing::warn!("Ignoring {CONFIG_LINK_ENV}: {e}");
    }
}
