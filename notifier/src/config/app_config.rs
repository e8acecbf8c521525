//! Immutable client configuration built from the settings DB.
//!
//! A `ClientConfig` is never mutated after it is loaded. Reconfiguration
//! builds a new one and restarts the services that read it.

use std::time::Duration;

use board_client::push::PushConfig;
use board_client::{BoardApiClient, BoardError};

use super::manager::SettingsManager;
use crate::notification::{DeleteNoticePolicy, NoticePolicy};
use crate::reconcile::{CursorResetPolicy, LayoutConfig, ReconcilerSettings};
use crate::window::{WindowLevel, WindowStyle};

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server_address: String,
    pub board_id: String,
    pub secret_key: String,
    pub window_level: WindowLevel,
    /// `None` keeps notices until dismissed.
    pub display_timeout: Option<Duration>,
    pub notify_new: bool,
    pub notify_task: bool,
    pub notify_sound: bool,
    pub delete_notice: DeleteNoticePolicy,
    pub font_size: u32,
    /// Percent, 10-100.
    pub opacity: u32,
    pub layout: LayoutConfig,
    pub layout_reset: CursorResetPolicy,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub push_heartbeat_interval: Duration,
    pub refresh_on_push: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            board_id: String::new(),
            secret_key: String::new(),
            window_level: WindowLevel::AlwaysOnTop,
            display_timeout: Some(Duration::from_secs(5)),
            notify_new: true,
            notify_task: true,
            notify_sound: true,
            delete_notice: DeleteNoticePolicy::Silent,
            font_size: 10,
            opacity: 90,
            layout: LayoutConfig::default(),
            layout_reset: CursorResetPolicy::WhenEmpty,
            poll_interval: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(30),
            push_heartbeat_interval: Duration::from_secs(10),
            refresh_on_push: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the settings manager. Unparsable values fall
    /// back to their defaults.
    pub fn load(sm: &SettingsManager) -> Result<Self, anyhow::Error> {
        let g = |key: &str| -> Result<String, anyhow::Error> {
            Ok(sm.get_setting(key)?.trim().to_string())
        };
        let d = Self::default();
        let layout = LayoutConfig {
            screen_width: parse_u32(&g("SCREEN_WIDTH")?, d.layout.screen_width),
            screen_height: parse_u32(&g("SCREEN_HEIGHT")?, d.layout.screen_height),
            top_margin: parse_u32(&g("TOP_MARGIN")?, d.layout.top_margin),
            window_width: parse_u32(&g("WINDOW_WIDTH")?, d.layout.window_width),
            window_height: parse_u32(&g("WINDOW_HEIGHT")?, d.layout.window_height),
            spacing: parse_u32(&g("WINDOW_SPACING")?, d.layout.spacing),
        };

        let display_timeout = match parse_u32(&g("DISPLAY_TIMEOUT_SECS")?, 5) {
            0 => None,
            secs => Some(Duration::from_secs(secs.into())),
        };

        Ok(Self {
            server_address: g("SERVER_ADDRESS")?,
            board_id: g("BOARD_ID")?,
            secret_key: g("SECRET_KEY")?,
            window_level: WindowLevel::from_str_setting(&g("WINDOW_LEVEL")?),
            display_timeout,
            notify_new: parse_bool(&g("NOTIFY_NEW")?, d.notify_new),
            notify_task: parse_bool(&g("NOTIFY_TASK")?, d.notify_task),
            notify_sound: parse_bool(&g("NOTIFY_SOUND")?, d.notify_sound),
            delete_notice: DeleteNoticePolicy::from_str_setting(&g("DELETE_NOTICE")?),
            font_size: parse_u32(&g("FONT_SIZE")?, d.font_size),
            opacity: parse_u32(&g("OPACITY")?, d.opacity).clamp(10, 100),
            layout,
            layout_reset: CursorResetPolicy::from_str_setting(&g("LAYOUT_RESET")?),
            poll_interval: parse_secs(&g("POLL_INTERVAL_SECS")?, d.poll_interval),
            heartbeat_interval: parse_secs(&g("HEARTBEAT_INTERVAL_SECS")?, d.heartbeat_interval),
            push_heartbeat_interval: parse_secs(
                &g("PUSH_HEARTBEAT_INTERVAL_SECS")?,
                d.push_heartbeat_interval,
            ),
            refresh_on_push: parse_bool(&g("REFRESH_ON_PUSH")?, d.refresh_on_push),
        })
    }

    pub fn is_board_configured(&self) -> bool {
        !self.server_address.is_empty() && !self.board_id.is_empty() && !self.secret_key.is_empty()
    }

    /// API client for the configured board.
    pub fn api_client(&self) -> Result<BoardApiClient, BoardError> {
        BoardApiClient::configure(&self.server_address, &self.board_id, &self.secret_key)
    }

    /// Push channel settings for an already configured API client.
    pub fn push_config(&self, api: &BoardApiClient) -> PushConfig {
        PushConfig::new(api.credentials().clone())
            .with_heartbeat_interval(self.push_heartbeat_interval)
    }

    pub fn window_style(&self) -> WindowStyle {
        WindowStyle {
            level: self.window_level,
            opacity: self.opacity as f32 / 100.0,
            font_size: self.font_size,
        }
    }

    pub fn notice_policy(&self) -> NoticePolicy {
        NoticePolicy {
            notify_new: self.notify_new,
            notify_task: self.notify_task,
            notify_sound: self.notify_sound,
            display_timeout: self.display_timeout,
            delete_notice: self.delete_notice,
        }
    }

    pub fn reconciler_settings(&self) -> ReconcilerSettings {
        ReconcilerSettings {
            layout: self.layout,
            cursor_reset: self.layout_reset,
            style: self.window_style(),
            notices: self.notice_policy(),
        }
    }
}

fn parse_u32(s: &str, default: u32) -> u32 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn parse_secs(s: &str, default: Duration) -> Duration {
    match s.parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => default,
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s {
        "true" => true,
        "false" => false,
        _ => default,
    }
}
