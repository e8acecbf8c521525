use std::sync::{Arc, Mutex};

use board_client::push::{ChangeKind, ConnectionState, PushEvent};
use board_client::{BoardError, DomainItem, ItemKey, ItemKind};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;

use super::*;
use crate::notification::{Notice, Severity};
use crate::window::{RenderError, WindowHandle, WindowRenderer, WindowStyle};

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Open(ItemKey, Frame),
    Update(WindowHandle),
    Close(WindowHandle),
    Notify(Notice),
    Connectivity(ConnectionState),
}

/// Renderer that records every call into a shared log.
#[derive(Default)]
struct RecordingRenderer {
    log: Arc<Mutex<Vec<Op>>>,
    next: u64,
    fail_open: Arc<Mutex<bool>>,
}

impl WindowRenderer for RecordingRenderer {
    fn open(
        &mut self,
        key: &ItemKey,
        _content: &WindowContent,
        frame: Frame,
        _style: &WindowStyle,
    ) -> Result<WindowHandle, RenderError> {
        if *self.fail_open.lock().unwrap() {
            return Err(RenderError::Open("display unavailable".into()));
        }
        self.next += 1;
        self.log.lock().unwrap().push(Op::Open(key.clone(), frame));
        Ok(WindowHandle(self.next))
    }

    fn update(&mut self, handle: WindowHandle, _content: &WindowContent) -> Result<(), RenderError> {
        self.log.lock().unwrap().push(Op::Update(handle));
        Ok(())
    }

    fn close(&mut self, handle: WindowHandle) {
        self.log.lock().unwrap().push(Op::Close(handle));
    }

    fn notify(&mut self, notice: &Notice) {
        self.log.lock().unwrap().push(Op::Notify(notice.clone()));
    }

    fn connectivity(&mut self, state: &ConnectionState) {
        self.log.lock().unwrap().push(Op::Connectivity(state.clone()));
    }
}

struct Harness {
    reconciler: WindowSetReconciler,
    log: Arc<Mutex<Vec<Op>>>,
    fail_open: Arc<Mutex<bool>>,
}

impl Harness {
    fn new() -> Self {
        Self::with_settings(ReconcilerSettings::default())
    }

    fn with_settings(settings: ReconcilerSettings) -> Self {
        let renderer = RecordingRenderer::default();
        let log = renderer.log.clone();
        let fail_open = renderer.fail_open.clone();
        Self {
            reconciler: WindowSetReconciler::new(Box::new(renderer), settings),
            log,
            fail_open,
        }
    }

    fn ops(&self) -> Vec<Op> {
        self.log.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    fn notices(&self) -> Vec<Notice> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn item(value: serde_json::Value) -> DomainItem {
    DomainItem::from_value(value, None).unwrap()
}

fn task(id: &str) -> DomainItem {
    item(json!({"id": id, "type": "task", "title": format!("Task {id}"), "is_completed": false, "priority": 2}))
}

fn event(change: ChangeKind, payload: DomainItem) -> PushEvent {
    PushEvent {
        change,
        kind: payload.kind(),
        item_id: payload.id().to_string(),
        payload: Some(payload),
    }
}

fn deleted(kind: ItemKind, id: &str) -> PushEvent {
    PushEvent {
        change: ChangeKind::Deleted,
        kind,
        item_id: id.to_string(),
        payload: None,
    }
}

#[test]
fn resync_opens_one_window_per_task() {
    let mut h = Harness::new();
    let summary = h.reconciler.full_resync(&[task("t1")], now());

    assert_eq!(summary.opened, 1);
    assert_eq!(h.reconciler.len(), 1);
    assert!(h.reconciler.is_visible(&ItemKey::task("t1")));
    let opens = h.ops().iter().filter(|op| matches!(op, Op::Open(..))).count();
    assert_eq!(opens, 1);
}

#[test]
fn completed_task_is_removed_on_resync() {
    let mut h = Harness::new();
    h.reconciler.full_resync(&[task("t1")], now());

    let done = item(json!({"id": "t1", "type": "task", "title": "Task t1", "is_completed": true}));
    let summary = h.reconciler.full_resync(&[done], now());

    assert_eq!(summary.closed, 1);
    assert!(h.reconciler.is_empty());
    assert!(h.ops().iter().any(|op| matches!(op, Op::Close(WindowHandle(1)))));
}

#[test]
fn resync_matches_desired_keys() {
    let mut h = Harness::new();
    let items = vec![
        task("t1"),
        task("t2"),
        item(json!({"id": "t1", "type": "assignment", "title": "Essay"})),
        item(json!({"id": "n1", "type": "announcement", "title": "Old", "due_date": "2000-01-01 00:00:00"})),
        item(json!({"id": "t3", "type": "task", "title": "Done", "is_completed": true})),
    ];
    h.reconciler.full_resync(&items, now());

    let expected: BTreeSet<ItemKey> = [
        ItemKey::task("t1"),
        ItemKey::task("t2"),
        ItemKey::new(ItemKind::Assignment, "t1"),
    ]
    .into_iter()
    .collect();
    assert_eq!(h.reconciler.visible_keys(), expected);

    // Dropping an item and adding another converges again.
    let next = vec![task("t2"), task("t4")];
    h.reconciler.full_resync(&next, now());
    let expected: BTreeSet<ItemKey> = [ItemKey::task("t2"), ItemKey::task("t4")].into_iter().collect();
    assert_eq!(h.reconciler.visible_keys(), expected);
}

#[test]
fn second_identical_resync_is_silent() {
    let mut h = Harness::new();
    let items = vec![task("t1"), task("t2")];
    h.reconciler.full_resync(&items, now());
    h.clear();

    let summary = h.reconciler.full_resync(&items, now());
    assert!(summary.is_noop());
    assert!(h.ops().is_empty());
}

#[test]
fn resync_raises_no_notices() {
    let mut h = Harness::new();
    h.reconciler.full_resync(&[task("t1")], now());
    assert!(h.notices().is_empty());
}

#[test]
fn system_level_task_raises_blocking_notice() {
    let mut h = Harness::with_settings(ReconcilerSettings {
        notices: NoticePolicy {
            notify_new: false,
            ..NoticePolicy::default()
        },
        ..ReconcilerSettings::default()
    });
    let urgent = item(json!({"id": "t9", "type": "task", "title": "Evacuate", "action_id": 2}));
    h.reconciler.apply_event(&event(ChangeKind::Created, urgent), now());

    assert!(h.reconciler.is_visible(&ItemKey::task("t9")));
    let notices = h.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::SystemLevel);
    assert!(notices[0].severity.requires_acknowledgement());
    assert_eq!(notices[0].timeout, None);
}

#[test]
fn acknowledge_keeps_window_and_complete_removes_it() {
    let mut h = Harness::new();
    let key = ItemKey::task("t1");
    h.reconciler.full_resync(&[task("t1")], now());

    h.reconciler.check_action(&key, TaskAction::Acknowledge).unwrap();
    h.reconciler.action_succeeded(&key, TaskAction::Acknowledge, now());
    assert!(h.reconciler.is_visible(&key));
    let entry = h.reconciler.entry(&key).unwrap();
    assert!(entry.content.acknowledged);
    assert!(!entry.content.can_acknowledge);
    assert!(h.ops().contains(&Op::Update(WindowHandle(1))));

    h.reconciler.check_action(&key, TaskAction::Complete).unwrap();
    h.reconciler.action_succeeded(&key, TaskAction::Complete, now());
    assert!(!h.reconciler.is_visible(&key));
    assert!(h.reconciler.is_empty());
}

#[test]
fn actions_on_missing_or_non_task_keys_conflict() {
    let mut h = Harness::new();
    h.reconciler.full_resync(
        &[item(json!({"id": "a1", "type": "assignment", "title": "Essay"}))],
        now(),
    );

    let missing = h.reconciler.check_action(&ItemKey::task("t1"), TaskAction::Complete);
    assert!(matches!(missing, Err(BoardError::StateConflict(_))));

    let assignment = ItemKey::new(ItemKind::Assignment, "a1");
    let wrong_kind = h.reconciler.check_action(&assignment, TaskAction::Acknowledge);
    assert!(matches!(wrong_kind, Err(BoardError::StateConflict(_))));
}

#[test]
fn delete_for_unknown_key_is_noop() {
    let mut h = Harness::new();
    h.reconciler.full_resync(&[task("t1")], now());
    h.clear();

    h.reconciler.apply_event(&deleted(ItemKind::Task, "t2"), now());
    h.reconciler.apply_event(&deleted(ItemKind::Assignment, "t1"), now());

    assert!(h.ops().is_empty());
    assert_eq!(h.reconciler.len(), 1);
}

#[test]
fn delete_notice_follows_policy() {
    let key = ItemKey::new(ItemKind::Announcement, "n1");
    let announcement = item(json!({"id": "n1", "type": "announcement", "title": "Assembly"}));

    let mut silent = Harness::new();
    silent.reconciler.full_resync(std::slice::from_ref(&announcement), now());
    silent.reconciler.apply_event(&deleted(ItemKind::Announcement, "n1"), now());
    assert!(!silent.reconciler.is_visible(&key));
    assert!(silent.notices().is_empty());

    let mut loud = Harness::with_settings(ReconcilerSettings {
        notices: NoticePolicy {
            delete_notice: crate::notification::DeleteNoticePolicy::Notify,
            ..NoticePolicy::default()
        },
        ..ReconcilerSettings::default()
    });
    loud.reconciler.full_resync(&[announcement], now());
    loud.reconciler.apply_event(&deleted(ItemKind::Announcement, "n1"), now());
    assert_eq!(loud.notices().len(), 1);
    assert_eq!(loud.notices()[0].message, "Assembly");
}

#[test]
fn created_for_visible_key_replaces_in_place() {
    let mut h = Harness::new();
    h.reconciler.full_resync(&[task("t1"), task("t2")], now());
    let frame = h.reconciler.entry(&ItemKey::task("t1")).unwrap().frame;

    let renamed = item(json!({"id": "t1", "type": "task", "title": "Renamed"}));
    h.reconciler.apply_event(&event(ChangeKind::Created, renamed), now());

    assert_eq!(h.reconciler.len(), 2);
    let entry = h.reconciler.entry(&ItemKey::task("t1")).unwrap();
    assert_eq!(entry.frame, frame);
    assert_eq!(entry.content.title, "Renamed");
    assert!(h.ops().contains(&Op::Close(WindowHandle(1))));
}

#[test]
fn created_for_hidden_payload_closes_existing_window() {
    let mut h = Harness::new();
    h.reconciler.full_resync(&[task("t1"), task("t2")], now());
    h.clear();

    let done = item(json!({"id": "t1", "type": "task", "title": "Task t1", "is_completed": true}));
    h.reconciler.apply_event(&event(ChangeKind::Created, done), now());

    assert!(!h.reconciler.is_visible(&ItemKey::task("t1")));
    assert!(h.reconciler.is_visible(&ItemKey::task("t2")));
    assert_eq!(h.ops(), vec![Op::Close(WindowHandle(1))]);
}

#[test]
fn updated_refreshes_hides_or_opens() {
    let mut h = Harness::new();
    let essay = item(json!({"id": "a1", "type": "assignment", "title": "Essay"}));
    h.reconciler.full_resync(&[essay], now());
    h.clear();

    let edited = item(json!({"id": "a1", "type": "assignment", "title": "Essay v2"}));
    h.reconciler.apply_event(&event(ChangeKind::Updated, edited), now());
    assert_eq!(h.ops(), vec![Op::Update(WindowHandle(1))]);
    assert_eq!(
        h.reconciler.entry(&ItemKey::new(ItemKind::Assignment, "a1")).unwrap().content.title,
        "Essay v2"
    );

    // Unchanged content issues no renderer call.
    h.clear();
    let same = item(json!({"id": "a1", "type": "assignment", "title": "Essay v2"}));
    h.reconciler.apply_event(&event(ChangeKind::Updated, same), now());
    assert!(h.ops().is_empty());

    // An update for a new key opens it without a creation notice.
    let fresh = item(json!({"id": "a2", "type": "assignment", "title": "Lab report"}));
    h.reconciler.apply_event(&event(ChangeKind::Updated, fresh), now());
    assert!(h.reconciler.is_visible(&ItemKey::new(ItemKind::Assignment, "a2")));
    assert!(h.notices().is_empty());

    // An announcement that expires through an update goes away.
    let notice = item(json!({"id": "n1", "type": "announcement", "title": "Fair"}));
    h.reconciler.apply_event(&event(ChangeKind::Created, notice), now());
    let expired = item(json!({
        "id": "n1", "type": "announcement", "title": "Fair", "due_date": "2025-03-01 11:00:00"
    }));
    h.reconciler.apply_event(&event(ChangeKind::Updated, expired), now());
    assert!(!h.reconciler.is_visible(&ItemKey::new(ItemKind::Announcement, "n1")));
}

#[test]
fn user_dismissal_survives_resync_until_recreated() {
    let mut h = Harness::new();
    let key = ItemKey::task("t1");
    h.reconciler.full_resync(&[task("t1")], now());
    h.clear();

    h.reconciler.window_closed(&key);
    assert!(!h.reconciler.is_visible(&key));
    assert!(h.reconciler.is_dismissed(&key));
    // The renderer already lost the window; no close is sent.
    assert!(h.ops().is_empty());

    h.reconciler.full_resync(&[task("t1")], now());
    assert!(!h.reconciler.is_visible(&key));

    h.reconciler.apply_event(&event(ChangeKind::Updated, task("t1")), now());
    assert!(!h.reconciler.is_visible(&key));

    h.reconciler.apply_event(&event(ChangeKind::Created, task("t1")), now());
    assert!(h.reconciler.is_visible(&key));
    assert!(!h.reconciler.is_dismissed(&key));
}

#[test]
fn dismissal_is_forgotten_once_item_leaves_the_board() {
    let mut h = Harness::new();
    let key = ItemKey::task("t1");
    h.reconciler.full_resync(&[task("t1")], now());
    h.reconciler.window_closed(&key);

    h.reconciler.full_resync(&[], now());
    assert!(!h.reconciler.is_dismissed(&key));
    h.reconciler.full_resync(&[task("t1")], now());
    assert!(h.reconciler.is_visible(&key));
}

#[test]
fn failed_open_leaves_no_entry_and_keeps_cursor() {
    let mut h = Harness::new();
    *h.fail_open.lock().unwrap() = true;

    let summary = h.reconciler.full_resync(&[task("t1")], now());
    assert_eq!(summary.failed, 1);
    assert!(h.reconciler.is_empty());
    assert_eq!(h.reconciler.cursor().position(), 0);

    *h.fail_open.lock().unwrap() = false;
    let summary = h.reconciler.full_resync(&[task("t1")], now());
    assert_eq!(summary.opened, 1);
    let frame = h.reconciler.entry(&ItemKey::task("t1")).unwrap().frame;
    assert_eq!(frame, LayoutConfig::default().slot_frame(0));
}

#[test]
fn cursor_resets_only_when_empty_by_default() {
    let mut h = Harness::new();
    h.reconciler.full_resync(&[task("t1"), task("t2"), task("t3")], now());
    assert_eq!(h.reconciler.cursor().position(), 3);

    h.reconciler.full_resync(&[task("t2"), task("t3")], now());
    assert_eq!(h.reconciler.cursor().position(), 3);

    h.reconciler.full_resync(&[], now());
    assert_eq!(h.reconciler.cursor().position(), 0);
}

#[test]
fn cursor_resets_on_every_close_when_configured() {
    let mut h = Harness::with_settings(ReconcilerSettings {
        cursor_reset: CursorResetPolicy::OnEveryClose,
        ..ReconcilerSettings::default()
    });
    h.reconciler.full_resync(&[task("t1"), task("t2"), task("t3")], now());
    h.reconciler.full_resync(&[task("t2"), task("t3")], now());
    assert_eq!(h.reconciler.cursor().position(), 0);

    // The freed first slot is reused, the others are skipped.
    h.reconciler.full_resync(&[task("t2"), task("t3"), task("t4")], now());
    let frame = h.reconciler.entry(&ItemKey::task("t4")).unwrap().frame;
    assert_eq!(frame, LayoutConfig::default().slot_frame(0));
}

#[test]
fn placements_never_overlap() {
    let layout = LayoutConfig {
        screen_width: 1000,
        screen_height: 600,
        ..LayoutConfig::default()
    };
    let mut h = Harness::with_settings(ReconcilerSettings {
        layout,
        ..ReconcilerSettings::default()
    });
    let capacity = layout.slot_count();
    let items: Vec<DomainItem> = (0..capacity).map(|i| task(&format!("t{i:02}"))).collect();
    h.reconciler.full_resync(&items, now());

    // Punch holes and refill them.
    let mut next: Vec<DomainItem> = items.iter().step_by(2).cloned().collect();
    next.extend((0..capacity / 2).map(|i| task(&format!("n{i:02}"))));
    h.reconciler.full_resync(&next, now());

    let frames: Vec<Frame> = h
        .reconciler
        .visible_keys()
        .iter()
        .map(|key| h.reconciler.entry(key).unwrap().frame)
        .collect();
    assert_eq!(frames.len(), next.len());
    for (i, a) in frames.iter().enumerate() {
        assert!(a.bottom() <= layout.screen_height as i32);
        for b in &frames[i + 1..] {
            assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn reconfigure_closes_everything() {
    let mut h = Harness::new();
    h.reconciler.full_resync(&[task("t1"), task("t2")], now());
    h.reconciler.window_closed(&ItemKey::task("t2"));

    h.reconciler.reconfigure(ReconcilerSettings {
        cursor_reset: CursorResetPolicy::OnEveryClose,
        ..ReconcilerSettings::default()
    });
    assert!(h.reconciler.is_empty());
    assert!(!h.reconciler.is_dismissed(&ItemKey::task("t2")));
    assert_eq!(h.reconciler.settings().cursor_reset, CursorResetPolicy::OnEveryClose);
}

#[test]
fn connectivity_is_forwarded() {
    let mut h = Harness::new();
    h.reconciler.connectivity(&ConnectionState::Connected);
    assert_eq!(h.ops(), vec![Op::Connectivity(ConnectionState::Connected)]);
}
