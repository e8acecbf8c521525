//! Window set reconciliation.
//!
//! Keeps exactly one window per visible item key. Full item lists are diffed
//! against the open windows; push events are applied one key at a time.
//! Every renderer call in the process goes through this type, and it is
//! owned by a single task.

pub mod content;
pub mod layout;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use layout::{CursorResetPolicy, Frame, LayoutConfig, LayoutCursor};
pub use visibility::should_show;

use std::collections::{BTreeSet, HashMap, HashSet};

use board_client::models::ItemBody;
use board_client::push::{ChangeKind, ConnectionState, PushEvent};
use board_client::{BoardError, DomainItem, ItemKey, ItemKind};
use chrono::NaiveDateTime;

use crate::notification::{self, Notice, NoticePolicy};
use crate::window::{WindowHandle, WindowRenderer, WindowStyle};
use content::WindowContent;

/// Everything the reconciler reads from the client configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilerSettings {
    pub layout: LayoutConfig,
    pub cursor_reset: CursorResetPolicy,
    pub style: WindowStyle,
    pub notices: NoticePolicy,
}

/// One open window.
#[derive(Debug, Clone)]
pub struct VisibleWindowEntry {
    pub item: DomainItem,
    pub frame: Frame,
    pub content: WindowContent,
    pub handle: WindowHandle,
}

/// Counters returned by [`WindowSetReconciler::full_resync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncSummary {
    pub opened: usize,
    pub closed: usize,
    pub failed: usize,
}

impl ResyncSummary {
    pub fn is_noop(&self) -> bool {
        self.opened == 0 && self.closed == 0 && self.failed == 0
    }
}

/// User actions on a task window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Acknowledge,
    Complete,
}

impl TaskAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledge",
            Self::Complete => "complete",
        }
    }
}

pub struct WindowSetReconciler {
    renderer: Box<dyn WindowRenderer>,
    settings: ReconcilerSettings,
    visible: HashMap<ItemKey, VisibleWindowEntry>,
    cursor: LayoutCursor,
    dismissed: HashSet<ItemKey>,
}

impl WindowSetReconciler {
    pub fn new(renderer: Box<dyn WindowRenderer>, settings: ReconcilerSettings) -> Self {
        Self {
            renderer,
            cursor: LayoutCursor::new(settings.layout),
            settings,
            visible: HashMap::new(),
            dismissed: HashSet::new(),
        }
    }

    /// Swap in new settings. Open windows belong to the old board and are closed.
    pub fn reconfigure(&mut self, settings: ReconcilerSettings) {
        self.close_all();
        self.dismissed.clear();
        self.cursor = LayoutCursor::new(settings.layout);
        self.settings = settings;
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn is_visible(&self, key: &ItemKey) -> bool {
        self.visible.contains_key(key)
    }

    pub fn is_dismissed(&self, key: &ItemKey) -> bool {
        self.dismissed.contains(key)
    }

    pub fn entry(&self, key: &ItemKey) -> Option<&VisibleWindowEntry> {
        self.visible.get(key)
    }

    pub fn visible_keys(&self) -> BTreeSet<ItemKey> {
        self.visible.keys().cloned().collect()
    }

    pub fn cursor(&self) -> &LayoutCursor {
        &self.cursor
    }

    /// Align the window set with an authoritative item list.
    pub fn full_resync(&mut self, items: &[DomainItem], now: NaiveDateTime) -> ResyncSummary {
        let desired: HashMap<ItemKey, &DomainItem> = items
            .iter()
            .filter(|item| should_show(item, now))
            .map(|item| (item.key(), item))
            .collect();

        let mut summary = ResyncSummary::default();

        let stale: Vec<ItemKey> = self
            .visible
            .keys()
            .filter(|key| !desired.contains_key(*key))
            .cloned()
            .collect();
        for key in stale {
            self.remove(&key);
            summary.closed += 1;
        }

        self.dismissed.retain(|key| desired.contains_key(key));

        let mut missing: Vec<(&ItemKey, &&DomainItem)> = desired
            .iter()
            .filter(|(key, _)| !self.visible.contains_key(*key) && !self.dismissed.contains(*key))
            .collect();
        // Stable placement order across runs.
        missing.sort_by(|a, b| a.0.cmp(b.0));
        for (_, item) in missing {
            if self.open(item, now) {
                summary.opened += 1;
            } else {
                summary.failed += 1;
            }
        }

        if !summary.is_noop() {
            tracing::info!(
                opened = summary.opened,
                closed = summary.closed,
                failed = summary.failed,
                visible = self.visible.len(),
                "Window set reconciled"
            );
        }
        summary
    }

    /// Apply one push event.
    pub fn apply_event(&mut self, event: &PushEvent, now: NaiveDateTime) {
        let key = event.key();
        match (event.change, &event.payload) {
            (ChangeKind::Created, Some(item)) => self.on_created(item, now),
            (ChangeKind::Updated, Some(item)) => self.on_updated(item, now),
            (ChangeKind::Deleted, _) => self.on_deleted(&key),
            (change, None) => {
                tracing::warn!(%key, ?change, "Push event without payload ignored");
            }
        }
    }

    fn on_created(&mut self, item: &DomainItem, now: NaiveDateTime) {
        let key = item.key();
        self.dismissed.remove(&key);
        if !should_show(item, now) {
            tracing::debug!(%key, "Created item is not visible");
            self.remove(&key);
            return;
        }
        self.open(item, now);
        if let Some(notice) = notification::creation_notice(item, &self.settings.notices) {
            self.renderer.notify(&notice);
        }
    }

    fn on_updated(&mut self, item: &DomainItem, now: NaiveDateTime) {
        let key = item.key();
        let show = should_show(item, now);
        if !self.visible.contains_key(&key) {
            if show && !self.dismissed.contains(&key) {
                self.open(item, now);
            }
            return;
        }
        if !show {
            self.remove(&key);
            return;
        }
        self.refresh(&key, item.clone(), now);
    }

    fn on_deleted(&mut self, key: &ItemKey) {
        self.dismissed.remove(key);
        let Some(title) = self.visible.get(key).map(|e| e.item.title().to_string()) else {
            tracing::debug!(%key, "Delete for a key without a window");
            return;
        };
        self.remove(key);
        if let Some(notice) = notification::deletion_notice(key, &title, &self.settings.notices) {
            self.renderer.notify(&notice);
        }
    }

    /// Check that a user action can be sent for `key`.
    pub fn check_action(&self, key: &ItemKey, action: TaskAction) -> Result<(), BoardError> {
        if key.kind != ItemKind::Task {
            return Err(BoardError::StateConflict(format!(
                "{} is not available for {key}",
                action.as_str()
            )));
        }
        if !self.visible.contains_key(key) {
            return Err(BoardError::StateConflict(format!("{key} is no longer visible")));
        }
        Ok(())
    }

    /// Record a successful action reported by the board.
    pub fn action_succeeded(&mut self, key: &ItemKey, action: TaskAction, now: NaiveDateTime) {
        match action {
            TaskAction::Complete => {
                if self.visible.contains_key(key) {
                    self.remove(key);
                }
            }
            TaskAction::Acknowledge => {
                let Some(mut item) = self.visible.get(key).map(|e| e.item.clone()) else {
                    return;
                };
                if let ItemBody::Task(task) = &mut item.body {
                    task.is_acknowledged = true;
                }
                self.refresh(key, item, now);
            }
        }
    }

    /// The user closed a window by hand; it is already gone on screen.
    pub fn window_closed(&mut self, key: &ItemKey) {
        if self.visible.remove(key).is_some() {
            tracing::info!(%key, "Window dismissed by user");
            self.dismissed.insert(key.clone());
            self.after_close();
        }
    }

    pub fn notify(&mut self, notice: &Notice) {
        self.renderer.notify(notice);
    }

    pub fn connectivity(&mut self, state: &ConnectionState) {
        self.renderer.connectivity(state);
    }

    /// Close every window, e.g. on shutdown.
    pub fn close_all(&mut self) {
        for (_, entry) in self.visible.drain() {
            self.renderer.close(entry.handle);
        }
        self.cursor.reset();
    }

    /// Open (or replace) the window for `item`. Returns whether it is on screen.
    fn open(&mut self, item: &DomainItem, now: NaiveDateTime) -> bool {
        let key = item.key();
        let replaced = self.visible.remove(&key);
        if let Some(old) = &replaced {
            self.renderer.close(old.handle);
        }

        // A replacement keeps the old window's place.
        let slot = match &replaced {
            Some(old) => layout::Slot {
                index: self.cursor.position(),
                frame: old.frame,
            },
            None => self
                .cursor
                .next_free(self.visible.values().map(|e| &e.frame)),
        };

        let content = content::project(item, now);
        match self
            .renderer
            .open(&key, &content, slot.frame, &self.settings.style)
        {
            Ok(handle) => {
                if replaced.is_none() {
                    self.cursor.commit(slot);
                }
                tracing::debug!(%key, %handle, x = slot.frame.x, y = slot.frame.y, "Window placed");
                self.visible.insert(
                    key,
                    VisibleWindowEntry {
                        item: item.clone(),
                        frame: slot.frame,
                        content,
                        handle,
                    },
                );
                true
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "Failed to open window");
                if replaced.is_some() {
                    self.after_close();
                }
                false
            }
        }
    }

    fn refresh(&mut self, key: &ItemKey, item: DomainItem, now: NaiveDateTime) {
        let Some(entry) = self.visible.get_mut(key) else {
            return;
        };
        let content = content::project(&item, now);
        entry.item = item;
        if content == entry.content {
            return;
        }
        match self.renderer.update(entry.handle, &content) {
            Ok(()) => entry.content = content,
            Err(e) => tracing::warn!(%key, error = %e, "Failed to update window"),
        }
    }

    fn remove(&mut self, key: &ItemKey) {
        if let Some(entry) = self.visible.remove(key) {
            self.renderer.close(entry.handle);
            self.after_close();
        }
    }

    fn after_close(&mut self) {
        match self.settings.cursor_reset {
            CursorResetPolicy::OnEveryClose => self.cursor.reset(),
            CursorResetPolicy::WhenEmpty if self.visible.is_empty() => self.cursor.reset(),
            CursorResetPolicy::WhenEmpty => {}
        }
    }
}
