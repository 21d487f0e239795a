use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::agent::AgentWorkload;
use crate::domain::file::FileAssignmentUpdate;

/// One placement decided by the engine
///
/// `pending_files` and `total_workload` are the chosen agent's counts
/// right after this file was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAssignment {
    pub file_id: String,
    pub agent_id: String,
    pub pending_files: u32,
    pub total_workload: u32,
}

/// Output of one engine run
///
/// Assignments are in the order the files were given. `workloads` holds
/// the final counts of every rostered agent, in roster order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentPlan {
    pub assignments: Vec<PlannedAssignment>,
    pub workloads: Vec<AgentWorkload>,
}

impl AssignmentPlan {
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Agent chosen for a file, if the file is in the plan
    pub fn agent_for(&self, file_id: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|a| a.file_id == file_id)
            .map(|a| a.agent_id.as_str())
    }

    /// Number of files placed on each agent by this plan
    pub fn distribution(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for assignment in &self.assignments {
            *counts.entry(assignment.agent_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Store updates for every placement, stamped with one assignment time
    pub fn updates(&self, assigned_at: DateTime<Utc>) -> Vec<FileAssignmentUpdate> {
        self.assignments
            .iter()
            .map(|a| FileAssignmentUpdate::assigned(&a.file_id, &a.agent_id, assigned_at))
            .collect()
    }
}
