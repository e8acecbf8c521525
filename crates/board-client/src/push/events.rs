//! Translation of named push events into normalized item events.

use serde_json::Value;

use super::{AuthResult, ChangeKind, PushEvent};
use crate::BoardError;
use crate::models::{DomainItem, ItemKind, id_from_value};

pub const EVENT_NEW_TASK: &str = "new_task";
pub const EVENT_NEW_ASSIGNMENT: &str = "new_assignment";
pub const EVENT_NEW_ANNOUNCEMENT: &str = "new_announcement";
pub const EVENT_UPDATE_ASSIGNMENT: &str = "update_assignment";
pub const EVENT_DELETE_TASK: &str = "delete_task";
pub const EVENT_DELETE_ASSIGNMENT: &str = "delete_assignment";
pub const EVENT_DELETE_ANNOUNCEMENT: &str = "delete_announcement";
/// Server-side authentication result.
pub const EVENT_CONNECTED: &str = "connected";
/// Emitted by the client on a timer.
pub const EVENT_HEARTBEAT: &str = "heartbeat";

pub(crate) enum Inbound {
    Item(PushEvent),
    Auth(AuthResult),
    Ignored,
}

pub(crate) fn translate(name: &str, data: Value) -> Result<Inbound, BoardError> {
    let (change, kind) = match name {
        EVENT_NEW_TASK => (ChangeKind::Created, ItemKind::Task),
        EVENT_NEW_ASSIGNMENT => (ChangeKind::Created, ItemKind::Assignment),
        EVENT_NEW_ANNOUNCEMENT => (ChangeKind::Created, ItemKind::Announcement),
        EVENT_UPDATE_ASSIGNMENT => (ChangeKind::Updated, ItemKind::Assignment),
        EVENT_DELETE_TASK => (ChangeKind::Deleted, ItemKind::Task),
        EVENT_DELETE_ASSIGNMENT => (ChangeKind::Deleted, ItemKind::Assignment),
        EVENT_DELETE_ANNOUNCEMENT => (ChangeKind::Deleted, ItemKind::Announcement),
        EVENT_CONNECTED => return Ok(Inbound::Auth(auth_result(&data))),
        _ => return Ok(Inbound::Ignored),
    };

    let event = match change {
        ChangeKind::Deleted => PushEvent {
            change,
            kind,
            item_id: deleted_id(kind, &data).ok_or_else(|| {
                BoardError::Protocol(format!("{name} event without an id: {data}"))
            })?,
            payload: None,
        },
        ChangeKind::Created | ChangeKind::Updated => {
            let item = DomainItem::from_value(data, Some(kind))?;
            if item.kind() != kind {
                return Err(BoardError::Protocol(format!(
                    "{name} event carried a {} item",
                    item.kind()
                )));
            }
            PushEvent {
                change,
                kind,
                item_id: item.id().to_string(),
                payload: Some(item),
            }
        }
    };
    Ok(Inbound::Item(event))
}

/// Deletion payloads name the id `{kind}_id`; fall back to a plain `id`.
fn deleted_id(kind: ItemKind, data: &Value) -> Option<String> {
    let specific = format!("{}_id", kind.as_str());
    data.get(&specific)
        .and_then(id_from_value)
        .or_else(|| data.get("id").and_then(id_from_value))
}

fn auth_result(data: &Value) -> AuthResult {
    let status = data
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let accepted = !matches!(
        status.to_ascii_lowercase().as_str(),
        "error" | "fail" | "failed" | "unauthorized"
    );
    AuthResult {
        accepted,
        status,
        message: data
            .get("message")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
    }
}
