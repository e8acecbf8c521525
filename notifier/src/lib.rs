//! Desktop notifier for a whiteboard service.
//!
//! Mirrors the board's tasks, assignments and announcements as floating
//! windows. Items arrive from a periodic full poll and from a push channel;
//! both feed one dispatcher that reconciles the on-screen window set.

pub mod app;
pub mod background;
pub mod bootstrap;
pub mod config;
pub mod dispatcher;
pub mod notification;
pub mod push_handler;
pub mod reconcile;
pub mod shutdown;
pub mod window;

pub use app::{AppShell, ShellHandle};
pub use bootstrap::init_foundation;
pub use config::{ClientConfig, SettingsManager};
pub use dispatcher::{AppMessage, ShellStatus};
pub use reconcile::{TaskAction, WindowSetReconciler};
pub use window::{TracingRenderer, WindowRenderer};
