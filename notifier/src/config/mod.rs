//! Configuration management: defaults, validation, loading from DB + environment.

pub mod app_config;
pub mod defaults;
pub mod manager;
pub mod validation;

pub use app_config::ClientConfig;
pub use manager::SettingsManager;

use serde::{Deserialize, Serialize};

/// Setting type: normal or secret (masked when listed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    Normal,
    Secret,
}

impl SettingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => board_store::settings::TYPE_NORMAL,
            Self::Secret => board_store::settings::TYPE_SECRET,
        }
    }
}

/// A setting together with its definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingInfo {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub required: bool,
    pub description: String,
    pub has_value: bool,
}

impl SettingInfo {
    /// Copy with the value hidden if the setting is secret.
    pub fn masked(&self) -> Self {
        let mut info = self.clone();
        if info.setting_type == SettingType::Secret && info.has_value {
            info.value = "********".to_string();
        }
        info
    }
}

/// Whether the client has what it needs to reach a board.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureStatus {
    pub board_configured: bool,
    pub missing_settings: Vec<String>,
    pub warnings: Vec<String>,
}
