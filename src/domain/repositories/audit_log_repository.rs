use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::assignment::AssignmentEvent;

/// Immutable audit log record
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Wraps a domain event as an audit record
    pub fn from_event(event: &AssignmentEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: event.actor().to_string(),
            action: event.action().to_string(),
            details: serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
            created_at: Utc::now(),
        }
    }
}

/// Repository trait for the append-only audit log
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append an entry; entries are never updated or deleted
    async fn append(&self, entry: AuditEntry) -> Result<(), String>;
}
