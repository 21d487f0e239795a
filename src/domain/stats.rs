// Assignment statistics view shown on the admin dashboard
//
// Computed from a full scan of agents and files, which is why the service
// caches it under the `assign` namespace.

use serde::{Deserialize, Serialize};

use crate::domain::agent::{Agent, AgentWorkload, WorkloadSnapshot};
use crate::domain::file::{FileRecord, FileStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentStats {
    pub total_files: usize,
    /// Paid files with no assignee
    pub unassigned_files: usize,
    pub pending_files: usize,
    pub completed_files: usize,
    pub active_agents: usize,
    pub inactive_agents: usize,
    pub agent_workloads: Vec<AgentWorkload>,
    /// Mean total workload over active agents
    pub average_workload: f64,
    /// Max minus min total workload over active agents
    pub workload_spread: u32,
}

impl AssignmentStats {
    pub fn compute(agents: &[Agent], files: &[FileRecord]) -> Self {
        let snapshot = WorkloadSnapshot::build(agents, files);

        let active_totals: Vec<u32> = snapshot.active().map(|w| w.total_workload()).collect();
        let average_workload = if active_totals.is_empty() {
            0.0
        } else {
            active_totals.iter().map(|&t| t as f64).sum::<f64>() / active_totals.len() as f64
        };
        let workload_spread = match (active_totals.iter().max(), active_totals.iter().min()) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        };

        let active_agents = active_totals.len();

        Self {
            total_files: files.len(),
            unassigned_files: files.iter().filter(|f| f.is_unassigned()).count(),
            pending_files: files.iter().filter(|f| f.status.is_pending()).count(),
            completed_files: files
                .iter()
                .filter(|f| f.status == FileStatus::Completed)
                .count(),
            active_agents,
            inactive_agents: agents.len() - active_agents,
            agent_workloads: snapshot.into_inner(),
            average_workload,
            workload_spread,
        }
    }
}
