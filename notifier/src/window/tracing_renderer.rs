use std::collections::HashMap;

use board_client::ItemKey;
use board_client::push::ConnectionState;

use super::{RenderError, WindowHandle, WindowRenderer, WindowStyle};
use crate::notification::Notice;
use crate::reconcile::content::WindowContent;
use crate::reconcile::layout::Frame;

/// Renderer for headless runs: every operation becomes a log line.
#[derive(Debug, Default)]
pub struct TracingRenderer {
    next_handle: u64,
    windows: HashMap<WindowHandle, ItemKey>,
}

impl TracingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_windows(&self) -> usize {
        self.windows.len()
    }
}

impl WindowRenderer for TracingRenderer {
    fn open(
        &mut self,
        key: &ItemKey,
        content: &WindowContent,
        frame: Frame,
        style: &WindowStyle,
    ) -> Result<WindowHandle, RenderError> {
        self.next_handle += 1;
        let handle = WindowHandle(self.next_handle);
        self.windows.insert(handle, key.clone());
        tracing::info!(
            %handle,
            %key,
            title = %content.title,
            x = frame.x,
            y = frame.y,
            level = style.level.as_str(),
            footer = %content.footer,
            "Window opened"
        );
        Ok(handle)
    }

    fn update(&mut self, handle: WindowHandle, content: &WindowContent) -> Result<(), RenderError> {
        let key = self
            .windows
            .get(&handle)
            .ok_or(RenderError::UnknownWindow(handle))?;
        tracing::info!(
            %handle,
            %key,
            title = %content.title,
            acknowledged = content.acknowledged,
            "Window updated"
        );
        Ok(())
    }

    fn close(&mut self, handle: WindowHandle) {
        match self.windows.remove(&handle) {
            Some(key) => tracing::info!(%handle, %key, "Window closed"),
            None => tracing::debug!(%handle, "Close for unknown window ignored"),
        }
    }

    fn notify(&mut self, notice: &Notice) {
        tracing::info!(
            severity = notice.severity.as_str(),
            title = %notice.title,
            message = %notice.message,
            timeout_secs = notice.timeout.map(|t| t.as_secs()),
            sound = notice.sound,
            "Notice"
        );
    }

    fn connectivity(&mut self, state: &ConnectionState) {
        match state {
            ConnectionState::Error(reason) => {
                tracing::warn!(%reason, "Board push channel unavailable")
            }
            other => tracing::info!(state = %other, "Board push channel status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::content::{Accent, WindowContent};

    fn content() -> WindowContent {
        WindowContent {
            title: "Sweep".into(),
            body: String::new(),
            footer: String::new(),
            accent: Accent::Task,
            can_acknowledge: true,
            can_complete: true,
            acknowledged: false,
        }
    }

    #[test]
    fn tracks_open_windows() {
        let mut renderer = TracingRenderer::new();
        let frame = Frame { x: 0, y: 0, width: 10, height: 10 };
        let a = renderer
            .open(&ItemKey::task("1"), &content(), frame, &WindowStyle::default())
            .unwrap();
        let b = renderer
            .open(&ItemKey::task("2"), &content(), frame, &WindowStyle::default())
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(renderer.open_windows(), 2);

        renderer.close(a);
        assert_eq!(renderer.open_windows(), 1);
        assert_eq!(
            renderer.update(a, &content()),
            Err(RenderError::UnknownWindow(a))
        );
        assert!(renderer.update(b, &content()).is_ok());
    }
}
