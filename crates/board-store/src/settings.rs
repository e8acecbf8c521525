//! Key-value settings table.

use std::collections::HashMap;

use rusqlite::OptionalExtension;

use crate::{Database, DbError};

pub const TYPE_NORMAL: &str = "normal";
pub const TYPE_SECRET: &str = "secret";

impl Database {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, DbError> {
        self.with_conn(|conn| {
            let value = conn
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    pub fn set_setting(&self, key: &str, value: &str, setting_type: &str) -> Result<(), DbError> {
        check_type(setting_type)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value, setting_type, updated_at) VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, setting_type = ?3, updated_at = CURRENT_TIMESTAMP",
                rusqlite::params![key, value, setting_type],
            )?;
            Ok(())
        })
    }

    /// Insert a value only if the key has never been stored.
    ///
    /// Returns `true` when a row was written.
    pub fn insert_setting_if_absent(
        &self,
        key: &str,
        value: &str,
        setting_type: &str,
    ) -> Result<bool, DbError> {
        check_type(setting_type)?;
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO settings (key, value, setting_type, updated_at)
                 VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)",
                rusqlite::params![key, value, setting_type],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_all_settings(&self) -> Result<HashMap<String, String>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut map = HashMap::new();
            for row in rows {
                let (k, v) = row?;
                map.insert(k, v);
            }
            Ok(map)
        })
    }

    pub fn get_settings_by_type(
        &self,
        setting_type: &str,
    ) -> Result<HashMap<String, String>, DbError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT key, value FROM settings WHERE setting_type = ?1")?;
            let rows = stmt.query_map([setting_type], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            rows.collect::<Result<HashMap<_, _>, _>>()
                .map_err(DbError::from)
        })
    }

    /// Write several values in one transaction. Existing rows keep their type.
    pub fn update_settings_bulk(&self, settings: &[(&str, &str)]) -> Result<(), DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO settings (key, value, setting_type, updated_at) VALUES (?1, ?2, 'normal', CURRENT_TIMESTAMP)
                     ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = CURRENT_TIMESTAMP",
                )?;
                for (key, value) in settings {
                    stmt.execute(rusqlite::params![key, value])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }
}

fn check_type(setting_type: &str) -> Result<(), DbError> {
    match setting_type {
        TYPE_NORMAL | TYPE_SECRET => Ok(()),
        other => Err(DbError::InvalidData(format!("unknown setting type: {other}"))),
    }
}
