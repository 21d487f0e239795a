use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::FileStatus;

/// An uploaded file as read from the document store
///
/// Only the fields the assignment backend needs are modelled. Store rows
/// are loosely shaped, so deserialization applies explicit defaults:
/// a missing status reads as `PendingPayment`, and a missing or empty
/// assignee reads as unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub assigned_agent_id: Option<String>,
    #[serde(default)]
    pub status: FileStatus,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Creates a record with no owner and no assignee
    pub fn new(id: impl Into<String>, status: FileStatus) -> Self {
        Self {
            id: id.into(),
            owner_id: None,
            assigned_agent_id: None,
            status,
            assigned_at: None,
        }
    }

    /// Sets the uploading user
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Sets the current assignee, normalising an empty id to `None`
    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        self.assigned_agent_id = if agent_id.is_empty() {
            None
        } else {
            Some(agent_id)
        };
        self
    }

    /// Paid and waiting for an agent
    pub fn is_unassigned(&self) -> bool {
        self.status == FileStatus::Paid && self.assigned_agent_id.is_none()
    }

    /// True if the engine may (re)assign this file
    pub fn is_assignable(&self) -> bool {
        self.status.can_transition_to(FileStatus::Assigned)
    }

    /// Applies a persisted assignment, overwriting any previous assignee
    pub fn apply(&mut self, update: &FileAssignmentUpdate) {
        self.assigned_agent_id = Some(update.agent_id.clone());
        self.status = update.status;
        self.assigned_at = Some(update.assigned_at);
    }
}

/// A single write against the file collection produced from a plan entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAssignmentUpdate {
    pub file_id: String,
    pub agent_id: String,
    pub status: FileStatus,
    pub assigned_at: DateTime<Utc>,
}

impl FileAssignmentUpdate {
    /// Builds the `-> Assigned` update for a file
    pub fn assigned(
        file_id: impl Into<String>,
        agent_id: impl Into<String>,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            agent_id: agent_id.into(),
            status: FileStatus::Assigned,
            assigned_at,
        }
    }
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_use_defaults() {
        let record: FileRecord = serde_json::from_value(json!({ "id": "f1" })).unwrap();

        assert_eq!(record.status, FileStatus::PendingPayment);
        assert!(record.assigned_agent_id.is_none());
        assert!(record.owner_id.is_none());
    }

    #[test]
    fn empty_assignee_reads_as_unassigned() {
        let record: FileRecord = serde_json::from_value(json!({
            "id": "f1",
            "status": "paid",
            "assigned_agent_id": ""
        }))
        .unwrap();

        assert!(record.is_unassigned());
    }

    #[test]
    fn unassigned_requires_paid_status() {
        assert!(FileRecord::new("f1", FileStatus::Paid).is_unassigned());
        assert!(!FileRecord::new("f1", FileStatus::PendingPayment).is_unassigned());
        assert!(!FileRecord::new("f1", FileStatus::Paid)
            .with_agent("a1")
            .is_unassigned());
    }

    #[test]
    fn assignable_statuses() {
        assert!(FileRecord::new("f1", FileStatus::Paid).is_assignable());
        assert!(FileRecord::new("f1", FileStatus::Assigned).is_assignable());
        assert!(!FileRecord::new("f1", FileStatus::Processing).is_assignable());
        assert!(!FileRecord::new("f1", FileStatus::Completed).is_assignable());
    }

    #[test]
    fn apply_overwrites_previous_assignee() {
        let mut record = FileRecord::new("f1", FileStatus::Assigned).with_agent("a1");
        let update = FileAssignmentUpdate::assigned("f1", "a2", Utc::now());

        record.apply(&update);

        assert_eq!(record.assigned_agent_id.as_deref(), Some("a2"));
        assert_eq!(record.status, FileStatus::Assigned);
        assert!(record.assigned_at.is_some());
    }
}
