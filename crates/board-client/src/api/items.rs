use serde_json::Value;

use super::response::{Ack, ApiEnvelope, HeartbeatStatus};
use super::*;
use crate::models::{DomainItem, ItemKind};
use crate::BoardError;

/// Optional query filters for the per-kind endpoints.
///
/// Filters that do not apply to the requested kind are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub date: Option<String>,
    /// Assignments only.
    pub subject: Option<String>,
    /// Tasks only.
    pub priority: Option<u8>,
    /// Tasks only.
    pub status: Option<String>,
    /// Announcements only.
    pub long_term: Option<bool>,
}

impl ItemFilter {
    fn query_for(&self, kind: ItemKind) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(date) = &self.date {
            query.push(("date", date.clone()));
        }
        match kind {
            ItemKind::Assignment => {
                if let Some(subject) = &self.subject {
                    query.push(("subject", subject.clone()));
                }
            }
            ItemKind::Task => {
                if let Some(priority) = self.priority {
                    query.push(("priority", priority.to_string()));
                }
                if let Some(status) = &self.status {
                    query.push(("status", status.clone()));
                }
            }
            ItemKind::Announcement => {
                if let Some(long_term) = self.long_term {
                    query.push(("long_term", long_term.to_string()));
                }
            }
        }
        query
    }
}

impl BoardApiClient {
    /// Fetch every item on the board, optionally for a single date.
    pub async fn fetch_all(&self, date: Option<&str>) -> Result<Vec<DomainItem>, BoardError> {
        let query: Vec<(&str, String)> = date.map(|d| ("date", d.to_string())).into_iter().collect();
        let envelope = self.board_get("/all", &query).await?;
        parse_items(envelope, None)
    }

    /// Fetch items of one kind with optional filters.
    pub async fn fetch_by_filter(
        &self,
        kind: ItemKind,
        filter: &ItemFilter,
    ) -> Result<Vec<DomainItem>, BoardError> {
        let path = format!("/{}", kind.plural());
        let envelope = self.board_get(&path, &filter.query_for(kind)).await?;
        parse_items(envelope, Some(kind))
    }

    /// Mark a task as seen. The task stays open.
    pub async fn acknowledge(&self, task_id: &str) -> Result<Ack, BoardError> {
        self.task_action(task_id, "acknowledge").await
    }

    /// Mark a task as done.
    pub async fn complete(&self, task_id: &str) -> Result<Ack, BoardError> {
        self.task_action(task_id, "complete").await
    }

    /// API-level liveness report.
    pub async fn heartbeat(&self) -> Result<HeartbeatStatus, BoardError> {
        let envelope = self.board_post("/heartbeat").await?;
        Ok(HeartbeatStatus {
            success: envelope.success,
            message: envelope
                .message
                .or(envelope.error)
                .unwrap_or_else(|| "unknown status".to_string()),
        })
    }

    async fn task_action(&self, task_id: &str, action: &str) -> Result<Ack, BoardError> {
        let path = format!("/tasks/{task_id}/{action}");
        let envelope = self.board_post(&path).await.map_err(|e| match e {
            BoardError::HttpStatus {
                status: 404 | 409,
                message,
            } => BoardError::StateConflict(format!("task {task_id}: {message}")),
            other => other,
        })?;
        if !envelope.success {
            return Err(BoardError::StateConflict(format!(
                "{action} of task {task_id} rejected: {}",
                envelope.reason()
            )));
        }
        tracing::debug!(task_id, action, "Task action accepted");
        Ok(Ack {
            message: envelope.message,
        })
    }
}

fn parse_items(envelope: ApiEnvelope, implied: Option<ItemKind>) -> Result<Vec<DomainItem>, BoardError> {
    if !envelope.success {
        return Err(BoardError::StateConflict(format!(
            "board reported failure: {}",
            envelope.reason()
        )));
    }
    match envelope.data {
        Some(Value::Array(items)) => {
            let total = items.len();
            let parsed: Vec<DomainItem> = items
                .into_iter()
                .filter_map(|item| match DomainItem::from_value(item, implied) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping invalid item");
                        None
                    }
                })
                .collect();
            if parsed.len() < total {
                tracing::warn!(kept = parsed.len(), total, "Some board items were dropped");
            }
            Ok(parsed)
        }
        Some(other) => Err(BoardError::Protocol(format!(
            "expected data array, got {other}"
        ))),
        None => Err(BoardError::Protocol("response is missing data".into())),
    }
}
