//! Projection of a domain item into what its window displays.

use board_client::models::ItemBody;
use board_client::{DomainItem, parse_board_timestamp};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Color family of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Accent {
    Task,
    Assignment,
    Announcement,
    /// System-level tasks.
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowContent {
    pub title: String,
    pub body: String,
    /// Remaining time or creation time.
    pub footer: String,
    pub accent: Accent,
    pub can_acknowledge: bool,
    pub can_complete: bool,
    pub acknowledged: bool,
}

pub fn project(item: &DomainItem, now: NaiveDateTime) -> WindowContent {
    let (body, accent, can_acknowledge, can_complete, acknowledged) = match &item.body {
        ItemBody::Task(task) => {
            let priority = match task.priority.unwrap_or(1) {
                1 => "low",
                2 => "medium",
                3 => "high",
                _ => "unknown",
            };
            let accent = if item.action_id() == Some(2) {
                Accent::Urgent
            } else {
                Accent::Task
            };
            (
                format!(
                    "Priority: {priority}\n{}",
                    non_empty(task.description.as_deref(), "No description")
                ),
                accent,
                !task.is_acknowledged,
                !task.is_completed,
                task.is_acknowledged,
            )
        }
        ItemBody::Assignment(assignment) => (
            format!(
                "Subject: {}\n{}",
                non_empty(assignment.subject.as_deref(), "No subject"),
                non_empty(assignment.description.as_deref(), "No description")
            ),
            Accent::Assignment,
            false,
            false,
            false,
        ),
        ItemBody::Announcement(announcement) => (
            non_empty(announcement.content.as_deref(), "No content").to_string(),
            Accent::Announcement,
            false,
            false,
            false,
        ),
    };

    WindowContent {
        title: item.title().to_string(),
        body,
        footer: time_text(item, now),
        accent,
        can_acknowledge,
        can_complete,
        acknowledged,
    }
}

fn non_empty<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

/// `"3 days left"`, `"5 hours left"`, `"Expired"` or `"Created 03-01 08:30"`.
pub fn time_text(item: &DomainItem, now: NaiveDateTime) -> String {
    if let Some(due) = item.due_date().and_then(parse_board_timestamp) {
        if due <= now {
            return "Expired".to_string();
        }
        let remaining = due - now;
        let days = remaining.num_days();
        if days > 0 {
            return format!("{days} days left");
        }
        return format!("{} hours left", remaining.num_hours());
    }

    item.envelope
        .created_at
        .as_deref()
        .and_then(parse_board_timestamp)
        .map(|created| format!("Created {}", created.format("%m-%d %H:%M")))
        .unwrap_or_default()
}
