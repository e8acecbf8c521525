//! SettingsManager: DB-backed settings with defaults, migration, and feature status.

use std::collections::BTreeMap;

use board_client::link::{ConfigLink, parse_config_link};
use board_store::Database;

use super::defaults::{DEFAULT_SETTINGS, required_keys};
use super::validation::validate_setting;
use super::{FeatureStatus, SettingInfo};

/// Wraps [`Database`] to provide high-level settings operations.
#[derive(Clone)]
pub struct SettingsManager {
    db: Database,
}

impl SettingsManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a setting value. Falls back to default if not in DB.
    pub fn get_setting(&self, key: &str) -> Result<String, anyhow::Error> {
        if let Some(val) = self.db.get_setting(key)? {
            return Ok(val);
        }
        if let Some(def) = DEFAULT_SETTINGS.get(key) {
            return Ok(def.default.to_string());
        }
        anyhow::bail!("setting not found: {key}");
    }

    /// Set a setting value with validation.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        let def = DEFAULT_SETTINGS
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("unknown setting key: {key}"))?;

        validate_setting(key, value)
            .map_err(|e| anyhow::anyhow!("validation error for {key}: {e}"))?;

        self.db.set_setting(key, value, def.setting_type().as_str())?;
        tracing::debug!(key, "Setting updated");
        Ok(())
    }

    /// All known settings, DB values first, defaults for the rest.
    pub fn get_all_settings(&self) -> Result<BTreeMap<String, SettingInfo>, anyhow::Error> {
        let db_settings = self.db.get_all_settings()?;
        let result = DEFAULT_SETTINGS
            .values()
            .map(|def| {
                let value = db_settings
                    .get(def.key)
                    .cloned()
                    .unwrap_or_else(|| def.default.to_string());
                let info = SettingInfo {
                    key: def.key.to_string(),
                    has_value: !value.is_empty(),
                    value,
                    setting_type: def.setting_type(),
                    required: def.required,
                    description: def.description.to_string(),
                };
                (def.key.to_string(), info)
            })
            .collect();
        Ok(result)
    }

    /// Write defaults for keys that were never stored. Returns how many were written.
    pub fn initialize_defaults(&self) -> Result<u32, anyhow::Error> {
        let mut written = 0u32;
        for def in DEFAULT_SETTINGS.values() {
            if self
                .db
                .insert_setting_if_absent(def.key, def.default, def.setting_type().as_str())?
            {
                written += 1;
            }
        }
        if written > 0 {
            tracing::debug!(written, "Default settings initialized");
        }
        Ok(written)
    }

    /// Copy settings from environment variables into the DB (one-time).
    ///
    /// Only keys without a non-empty stored value are taken, so this must run
    /// before [`initialize_defaults`](Self::initialize_defaults) fills them.
    pub fn migrate_from_env(&self) -> Result<u32, anyhow::Error> {
        let mut migrated = 0u32;
        for def in DEFAULT_SETTINGS.values() {
            if self.db.get_setting(def.key)?.is_some_and(|v| !v.is_empty()) {
                continue;
            }
            let Ok(env_val) = std::env::var(def.key) else {
                continue;
            };
            if env_val.is_empty() {
                continue;
            }
            if let Err(e) = validate_setting(def.key, &env_val) {
                tracing::warn!(key = def.key, error = %e, "Ignoring invalid setting from env");
                continue;
            }
            self.db
                .set_setting(def.key, &env_val, def.setting_type().as_str())?;
            tracing::info!("Migrated setting from env: {}", def.key);
            migrated += 1;
        }
        if migrated > 0 {
            tracing::info!("Migration completed: {migrated} settings migrated");
            if has_secret_in_env() {
                tracing::warn!(
                    "SECURITY WARNING: SECRET_KEY is set in the environment. \
                     Remove it from .env after confirming migration."
                );
            }
        }
        Ok(migrated)
    }

    /// Store the credentials carried by a `dlass://config/...` link.
    pub fn apply_config_link(&self, link: &str) -> Result<ConfigLink, anyhow::Error> {
        let parsed =
            parse_config_link(link).ok_or_else(|| anyhow::anyhow!("invalid config link"))?;
        self.set_setting("BOARD_ID", &parsed.board_id)?;
        self.set_setting("SECRET_KEY", &parsed.secret_key)?;
        tracing::info!(board_id = %parsed.board_id, "Applied config link");
        Ok(parsed)
    }

    /// Check whether the board connection is configured.
    pub fn check_feature_status(&self) -> Result<FeatureStatus, anyhow::Error> {
        let mut status = FeatureStatus {
            board_configured: true,
            ..FeatureStatus::default()
        };

        for key in required_keys() {
            if self.get_setting(key)?.trim().is_empty() {
                status.missing_settings.push(key.to_string());
                status.board_configured = false;
            }
        }

        if self.get_setting("NOTIFY_NEW")? == "false" {
            status
                .warnings
                .push("NOTIFY_NEW is disabled - only urgent tasks raise notices".into());
        }
        if self.get_setting("DISPLAY_TIMEOUT_SECS")? == "0" {
            status
                .warnings
                .push("DISPLAY_TIMEOUT_SECS is 0 - notices stay until dismissed".into());
        }

        Ok(status)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

fn has_secret_in_env() -> bool {
    std::env::var("SECRET_KEY").is_ok_and(|v| !v.is_empty())
}
