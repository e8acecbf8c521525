//! Notices raised alongside item windows.
//!
//! New items are tiered by urgency: a task tagged `action_id == 2` is
//! system-level and always announced, a high-priority task is a warning,
//! everything else is informational. The lower two tiers honour the user's
//! notification switches.

pub mod types;

pub use types::{DeleteNoticePolicy, Notice, Severity};

use std::time::Duration;

use board_client::{BoardError, DomainItem, ItemKey, ItemKind};

/// Timeout of error notices.
const ERROR_NOTICE_TIMEOUT: Duration = Duration::from_secs(3);

/// Notification switches taken from the client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticePolicy {
    pub notify_new: bool,
    pub notify_task: bool,
    pub notify_sound: bool,
    /// Base timeout of tier 1 notices; `None` means unlimited.
    pub display_timeout: Option<Duration>,
    pub delete_notice: DeleteNoticePolicy,
}

impl Default for NoticePolicy {
    fn default() -> Self {
        Self {
            notify_new: true,
            notify_task: true,
            notify_sound: true,
            display_timeout: Some(Duration::from_secs(5)),
            delete_notice: DeleteNoticePolicy::Silent,
        }
    }
}

pub fn severity_for(item: &DomainItem) -> Severity {
    match item.as_task() {
        Some(_) if item.action_id() == Some(2) => Severity::SystemLevel,
        Some(task) if task.priority == Some(3) => Severity::Warning,
        _ => Severity::Informational,
    }
}

/// Notice for an item the board just created, if the policy allows one.
pub fn creation_notice(item: &DomainItem, policy: &NoticePolicy) -> Option<Notice> {
    let severity = severity_for(item);
    let timeout = match severity {
        Severity::SystemLevel => None,
        Severity::Warning => policy.display_timeout.map(|t| t * 2),
        Severity::Informational => policy.display_timeout,
    };

    if severity != Severity::SystemLevel {
        let allowed = policy.notify_new && (item.kind() != ItemKind::Task || policy.notify_task);
        if !allowed {
            tracing::debug!(key = %item.key(), "Creation notice suppressed by settings");
            return None;
        }
    }

    let title = match severity {
        Severity::SystemLevel => format!("Urgent {}", item.kind()),
        _ => format!("New {}", item.kind()),
    };
    Some(Notice {
        severity,
        title,
        message: item.title().to_string(),
        timeout,
        sound: policy.notify_sound || severity == Severity::SystemLevel,
        key: Some(item.key()),
    })
}

pub fn deletion_notice(key: &ItemKey, title: &str, policy: &NoticePolicy) -> Option<Notice> {
    match policy.delete_notice {
        DeleteNoticePolicy::Silent => None,
        DeleteNoticePolicy::Notify => Some(Notice {
            severity: Severity::Informational,
            title: format!("{} removed", capitalize(key.kind.as_str())),
            message: title.to_string(),
            timeout: policy.display_timeout,
            sound: false,
            key: Some(key.clone()),
        }),
    }
}

/// Notice for a failed operation. Auth problems are raised as warnings.
pub fn error_notice(context: &str, error: &BoardError) -> Notice {
    let severity = if error.is_auth_error() {
        Severity::Warning
    } else {
        Severity::Informational
    };
    Notice {
        severity,
        title: context.to_string(),
        message: error.to_string(),
        timeout: Some(ERROR_NOTICE_TIMEOUT),
        sound: false,
        key: None,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
