use std::collections::BTreeMap;

use serde::Serialize;

/// Domain events emitted by assignment runs
///
/// These are appended to the audit log so admins can see who triggered an
/// assignment, which files and agents were involved, and the resulting
/// distribution.
///
/// # Example
/// ```
/// use docdesk_api::domain::assignment::AssignmentEvent;
///
/// let event = AssignmentEvent::FileReassigned {
///     actor: "admin-1".to_string(),
///     file_id: "f1".to_string(),
///     previous_agent_id: None,
///     agent_id: "agent-7".to_string(),
/// };
/// assert_eq!(event.action(), "file_reassigned");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssignmentEvent {
    /// Fired after a bulk run committed at least one batch
    FilesAssigned {
        /// Admin who triggered the run
        actor: String,
        /// Files the engine planned to place
        planned: usize,
        /// Files actually written
        assigned: usize,
        /// Committed file ids
        file_ids: Vec<String>,
        /// Committed files per agent
        distribution: BTreeMap<String, usize>,
    },
    /// Fired when an admin overrides a single file's assignee
    FileReassigned {
        actor: String,
        file_id: String,
        previous_agent_id: Option<String>,
        agent_id: String,
    },
}

impl AssignmentEvent {
    /// Returns the admin who caused this event
    pub fn actor(&self) -> &str {
        match self {
            AssignmentEvent::FilesAssigned { actor, .. } => actor,
            AssignmentEvent::FileReassigned { actor, .. } => actor,
        }
    }

    /// Stable action name used as the audit log entry kind
    pub fn action(&self) -> &'static str {
        match self {
            AssignmentEvent::FilesAssigned { .. } => "files_assigned",
            AssignmentEvent::FileReassigned { .. } => "file_reassigned",
        }
    }
}
