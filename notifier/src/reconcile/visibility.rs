use board_client::models::ItemBody;
use board_client::{DomainItem, parse_board_timestamp};
use chrono::NaiveDateTime;

/// Whether an item deserves a window at `now` (local wall-clock time).
///
/// Announcements with an unparsable due date stay visible.
pub fn should_show(item: &DomainItem, now: NaiveDateTime) -> bool {
    match &item.body {
        ItemBody::Task(task) => !task.is_completed,
        ItemBody::Assignment(_) => true,
        ItemBody::Announcement(announcement) => {
            if announcement.is_long_term {
                return true;
            }
            match announcement.due_date.as_deref().map(str::trim) {
                None | Some("") => true,
                Some(raw) => match parse_board_timestamp(raw) {
                    Some(due) => due >= now,
                    None => {
                        tracing::debug!(id = item.id(), due_date = raw, "Unparsable due date, showing");
                        true
                    }
                },
            }
        }
    }
}
