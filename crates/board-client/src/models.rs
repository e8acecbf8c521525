//! Typed domain items served by the board.
//!
//! Items arrive as loosely-typed JSON. They are validated once here, at the
//! boundary, so nothing downstream has to deal with missing fields.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::BoardError;

/// Native timestamp format used by the board.
pub const BOARD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of a domain item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Task,
    Assignment,
    Announcement,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [Self::Task, Self::Assignment, Self::Announcement];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Assignment => "assignment",
            Self::Announcement => "announcement",
        }
    }

    /// Collection name used in endpoint paths.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Task => "tasks",
            Self::Assignment => "assignments",
            Self::Announcement => "announcements",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of an item: raw ids are only unique within a kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub kind: ItemKind,
    pub id: String,
}

impl ItemKey {
    pub fn new(kind: ItemKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn task(id: impl Into<String>) -> Self {
        Self::new(ItemKind::Task, id)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Fields shared by every item kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEnvelope {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Urgency tag: 1 normal, 2 elevated/system-level.
    #[serde(default)]
    pub action_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBody {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_priority")]
    pub priority: Option<u8>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_acknowledged: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_completed: bool,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentBody {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementBody {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_long_term: bool,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub due_date: Option<String>,
}

/// Kind-specific part of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemBody {
    Task(TaskBody),
    Assignment(AssignmentBody),
    Announcement(AnnouncementBody),
}

/// A server-authoritative record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainItem {
    pub envelope: ItemEnvelope,
    pub body: ItemBody,
}

impl DomainItem {
    /// Validate and convert a raw JSON item.
    ///
    /// `implied` supplies the kind for per-kind endpoints and push events
    /// whose payloads omit `type`.
    pub fn from_value(mut value: Value, implied: Option<ItemKind>) -> Result<Self, BoardError> {
        if !value.is_object() {
            return Err(BoardError::Protocol(format!(
                "item is not an object: {value}"
            )));
        }
        if let (Some(kind), Some(obj)) = (implied, value.as_object_mut()) {
            obj.entry("type")
                .or_insert_with(|| Value::String(kind.as_str().to_string()));
        }

        let envelope: ItemEnvelope = serde_json::from_value(value.clone())
            .map_err(|e| BoardError::Protocol(format!("invalid item envelope: {e}")))?;
        let body = match envelope.kind {
            ItemKind::Task => ItemBody::Task(parse_body(value, &envelope)?),
            ItemKind::Assignment => ItemBody::Assignment(parse_body(value, &envelope)?),
            ItemKind::Announcement => ItemBody::Announcement(parse_body(value, &envelope)?),
        };
        Ok(Self { envelope, body })
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.envelope.kind, self.envelope.id.clone())
    }

    pub fn kind(&self) -> ItemKind {
        self.envelope.kind
    }

    pub fn id(&self) -> &str {
        &self.envelope.id
    }

    pub fn title(&self) -> &str {
        &self.envelope.title
    }

    pub fn action_id(&self) -> Option<i64> {
        self.envelope.action_id
    }

    pub fn due_date(&self) -> Option<&str> {
        match &self.body {
            ItemBody::Task(t) => t.due_date.as_deref(),
            ItemBody::Assignment(a) => a.due_date.as_deref(),
            ItemBody::Announcement(a) => a.due_date.as_deref(),
        }
    }

    pub fn as_task(&self) -> Option<&TaskBody> {
        match &self.body {
            ItemBody::Task(t) => Some(t),
            _ => None,
        }
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(
    value: Value,
    envelope: &ItemEnvelope,
) -> Result<T, BoardError> {
    serde_json::from_value(value).map_err(|e| {
        BoardError::Protocol(format!(
            "invalid {} body for id {}: {e}",
            envelope.kind, envelope.id
        ))
    })
}

/// Parse a timestamp as sent by the board into local wall-clock time.
///
/// Returns `None` for empty or unrecognized values; callers decide how to
/// treat those.
pub fn parse_board_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in [BOARD_TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
}

/// Read an id that may be sent as a string or an integer.
pub(crate) fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid id: {value}")))
}

/// Keep any scalar as text; timestamps the board sends in odd shapes must
/// not reject the item.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => {
            tracing::debug!(value = %other, "Ignoring non-scalar text field");
            None
        }
    })
}

/// Priorities come as `1..=3`, sometimes quoted. Anything else means unset.
fn deserialize_priority<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(parsed.and_then(|p| u8::try_from(p).ok()))
}

/// Accept `true`/`false`, `0`/`1` and `null` for boolean flags.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        Value::Number(n) => Ok(n.as_i64().is_some_and(|i| i != 0)),
        other => Err(serde::de::Error::custom(format!("invalid flag: {other}"))),
    }
}
