//! Notice type definitions.

use std::time::Duration;

use board_client::ItemKey;
use serde::{Deserialize, Serialize};

/// Urgency tier of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Tier 1: transient.
    Informational,
    /// Tier 2: shown for longer.
    Warning,
    /// Tier 3: stays until the user acknowledges it.
    SystemLevel,
}

impl Severity {
    pub fn tier(self) -> u8 {
        match self {
            Self::Informational => 1,
            Self::Warning => 2,
            Self::SystemLevel => 3,
        }
    }

    pub fn requires_acknowledgement(self) -> bool {
        self == Self::SystemLevel
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Informational => "informational",
            Self::Warning => "warning",
            Self::SystemLevel => "system_level",
        }
    }
}

/// A desktop notification, separate from item windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// `None` keeps the notice until dismissed.
    pub timeout: Option<Duration>,
    pub sound: bool,
    /// Item the notice is about, if any.
    #[serde(skip)]
    pub key: Option<ItemKey>,
}

/// What happens when an item disappears because the board deleted it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteNoticePolicy {
    #[default]
    Silent,
    Notify,
}

impl DeleteNoticePolicy {
    pub fn from_str_setting(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "notify" => Self::Notify,
            _ => Self::Silent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Notify => "notify",
        }
    }
}
