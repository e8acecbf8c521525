//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::SettingType;

/// `(key, default, secret, required, description)`
type DefTuple = (&'static str, &'static str, bool, bool, &'static str);

const DEFS: &[DefTuple] = &[
    // Board connection
    ("SERVER_ADDRESS", "", false, true, "Board server address (host[:port] or URL)"),
    ("BOARD_ID", "", false, true, "Board identifier"),
    ("SECRET_KEY", "", true, true, "Board secret key"),
    // Windows
    ("WINDOW_LEVEL", "always_on_top", false, false, "Window level: normal, always_on_top or desktop"),
    ("WINDOW_WIDTH", "300", false, false, "Item window width in pixels"),
    ("WINDOW_HEIGHT", "120", false, false, "Item window height in pixels"),
    ("WINDOW_SPACING", "10", false, false, "Gap between item windows in pixels"),
    ("OPACITY", "90", false, false, "Window opacity in percent"),
    ("FONT_SIZE", "10", false, false, "Window font size"),
    ("SCREEN_WIDTH", "1920", false, false, "Usable screen width in pixels"),
    ("SCREEN_HEIGHT", "1080", false, false, "Usable screen height in pixels"),
    ("TOP_MARGIN", "50", false, false, "Distance of the first window from the top edge"),
    ("LAYOUT_RESET", "when_empty", false, false, "When placement restarts at the first slot: when_empty or every_close"),
    // Notices
    ("DISPLAY_TIMEOUT_SECS", "5", false, false, "Notice display time in seconds, 0 for unlimited"),
    ("NOTIFY_NEW", "true", false, false, "Announce new items"),
    ("NOTIFY_TASK", "true", false, false, "Announce new tasks"),
    ("NOTIFY_SOUND", "true", false, false, "Play a sound with notices"),
    ("DELETE_NOTICE", "silent", false, false, "Notice for deleted items: silent or notify"),
    // Timers
    ("POLL_INTERVAL_SECS", "30", false, false, "Full refresh interval in seconds"),
    ("HEARTBEAT_INTERVAL_SECS", "30", false, false, "API heartbeat interval in seconds"),
    ("PUSH_HEARTBEAT_INTERVAL_SECS", "10", false, false, "Push channel heartbeat interval in seconds"),
    ("REFRESH_ON_PUSH", "true", false, false, "Refresh the full item list after every push event"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub secret: bool,
    pub required: bool,
    pub description: &'static str,
}

impl SettingDef {
    pub fn setting_type(&self) -> SettingType {
        if self.secret {
            SettingType::Secret
        } else {
            SettingType::Normal
        }
    }
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, secret, required, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    secret,
                    required,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}

/// Keys of settings that must be non-empty before the board can be reached.
pub fn required_keys() -> impl Iterator<Item = &'static str> {
    DEFS.iter()
        .filter(|&&(_, _, _, required, _)| required)
        .map(|&(key, ..)| key)
}
