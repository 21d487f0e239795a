use std::collections::BTreeMap;

use serde::Serialize;

use super::plan::AssignmentPlan;
use crate::domain::agent::AgentWorkload;

/// Outcome of persisting a plan
///
/// Bulk assignment reports counts rather than a bare success flag, since a
/// partially committed write is an expected outcome at scale. `succeeded`
/// and `failed` together hold every planned file id exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentReport {
    pub planned: usize,
    pub assigned: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Files actually committed per agent
    pub distribution: BTreeMap<String, usize>,
    /// Workload per agent reflecting only committed assignments
    pub workloads: Vec<AgentWorkload>,
}

impl AssignmentReport {
    /// Builds a report where the first `committed` plan entries were written
    ///
    /// Batches are written in plan order, so the committed files are always
    /// a prefix of the plan.
    pub fn from_plan(plan: &AssignmentPlan, committed: usize) -> Self {
        let committed = committed.min(plan.len());
        let (done, rest) = plan.assignments.split_at(committed);

        let mut distribution = BTreeMap::new();
        for assignment in done {
            *distribution.entry(assignment.agent_id.clone()).or_insert(0) += 1;
        }

        let mut workloads = plan.workloads.clone();
        for assignment in rest {
            if let Some(w) = workloads
                .iter_mut()
                .find(|w| w.agent_id == assignment.agent_id)
            {
                w.pending_files = w.pending_files.saturating_sub(1);
            }
        }

        Self {
            planned: plan.len(),
            assigned: committed,
            succeeded: done.iter().map(|a| a.file_id.clone()).collect(),
            failed: rest.iter().map(|a| a.file_id.clone()).collect(),
            distribution,
            workloads,
        }
    }

    /// Counts each failed file back against the agent still holding it
    ///
    /// A failed write leaves the store untouched, so a file that was being
    /// moved off another agent still belongs to that agent. `previous`
    /// looks up the assignee a file had before the run.
    pub fn restore_unwritten<F>(&mut self, previous: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for file_id in &self.failed {
            let Some(agent_id) = previous(file_id) else {
                continue;
            };
            if let Some(w) = self.workloads.iter_mut().find(|w| w.agent_id == agent_id) {
                w.add_pending();
            }
        }
    }

    /// Report for a run with nothing to place
    pub fn empty(workloads: Vec<AgentWorkload>) -> Self {
        Self {
            workloads,
            ..Self::default()
        }
    }

    /// True when every planned file was committed
    pub fn is_complete(&self) -> bool {
        self.assigned == self.planned
    }

    /// Human-readable count, e.g. "assigned 3 of 5 files"
    pub fn summary(&self) -> String {
        format!("assigned {} of {} files", self.assigned, self.planned)
    }
}
