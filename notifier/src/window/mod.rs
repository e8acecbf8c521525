//! Rendering collaborator boundary.
//!
//! The reconciler decides which windows exist and where; a
//! [`WindowRenderer`] turns those decisions into pixels. The renderer is only
//! ever driven from the dispatcher task.

mod tracing_renderer;

pub use tracing_renderer::TracingRenderer;

use std::fmt;

use board_client::ItemKey;
use board_client::push::ConnectionState;
use serde::{Deserialize, Serialize};

use crate::notification::Notice;
use crate::reconcile::content::WindowContent;
use crate::reconcile::layout::Frame;

/// Stacking level of item windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowLevel {
    Normal,
    #[default]
    AlwaysOnTop,
    /// Pinned below other windows.
    Desktop,
}

impl WindowLevel {
    /// Accepts names and the numeric levels `0`/`1`/`2`.
    pub fn from_str_setting(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "normal" | "0" => Self::Normal,
            "desktop" | "bottom" | "2" => Self::Desktop,
            _ => Self::AlwaysOnTop,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::AlwaysOnTop => "always_on_top",
            Self::Desktop => "desktop",
        }
    }
}

/// Appearance shared by every item window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStyle {
    pub level: WindowLevel,
    /// 0.0 (transparent) to 1.0 (opaque).
    pub opacity: f32,
    pub font_size: u32,
}

impl Default for WindowStyle {
    fn default() -> Self {
        Self {
            level: WindowLevel::default(),
            opacity: 0.9,
            font_size: 10,
        }
    }
}

/// Opaque renderer-side window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("window could not be created: {0}")]
    Open(String),

    #[error("unknown window {0}")]
    UnknownWindow(WindowHandle),
}

/// Side effects the reconciler needs from a display layer.
pub trait WindowRenderer: Send {
    fn open(
        &mut self,
        key: &ItemKey,
        content: &WindowContent,
        frame: Frame,
        style: &WindowStyle,
    ) -> Result<WindowHandle, RenderError>;

    fn update(&mut self, handle: WindowHandle, content: &WindowContent) -> Result<(), RenderError>;

    fn close(&mut self, handle: WindowHandle);

    fn notify(&mut self, notice: &Notice);

    /// Connection status indicator (tray tooltip or similar).
    fn connectivity(&mut self, state: &ConnectionState);
}
