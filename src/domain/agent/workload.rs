use std::collections::HashMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::agent::Agent;
use crate::domain::file::{FileRecord, FileStatus};

/// Per-agent workload used as the fairness signal
///
/// # Invariants
/// - `total_workload()` is always `completed_files + pending_files`; it is
///   derived on read and never stored
/// - Counts missing from a store row read as 0
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentWorkload {
    pub agent_id: String,
    #[serde(default)]
    pub completed_files: u32,
    #[serde(default)]
    pub pending_files: u32,
    #[serde(default)]
    pub is_active: bool,
}

impl AgentWorkload {
    /// Creates an active workload record
    pub fn new(agent_id: impl Into<String>, completed_files: u32, pending_files: u32) -> Self {
        Self {
            agent_id: agent_id.into(),
            completed_files,
            pending_files,
            is_active: true,
        }
    }

    /// Creates a zeroed record mirroring the agent's active flag
    pub fn for_agent(agent: &Agent) -> Self {
        Self {
            agent_id: agent.id.clone(),
            completed_files: 0,
            pending_files: 0,
            is_active: agent.is_active,
        }
    }

    /// Marks the record inactive
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Completed plus pending files
    pub fn total_workload(&self) -> u32 {
        self.completed_files.saturating_add(self.pending_files)
    }

    /// Records one newly assigned (pending) file
    pub fn add_pending(&mut self) {
        self.pending_files = self.pending_files.saturating_add(1);
    }

    fn record(&mut self, status: FileStatus) {
        if status == FileStatus::Completed {
            self.completed_files = self.completed_files.saturating_add(1);
        } else if status.is_pending() {
            self.add_pending();
        }
    }
}

impl Serialize for AgentWorkload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AgentWorkload", 5)?;
        state.serialize_field("agent_id", &self.agent_id)?;
        state.serialize_field("completed_files", &self.completed_files)?;
        state.serialize_field("pending_files", &self.pending_files)?;
        state.serialize_field("total_workload", &self.total_workload())?;
        state.serialize_field("is_active", &self.is_active)?;
        state.end()
    }
}

/// Workload of every rostered agent, rebuilt from the file collection
///
/// The store's file records are the source of truth; snapshots are never
/// persisted and are rebuilt on every assignment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkloadSnapshot {
    workloads: Vec<AgentWorkload>,
}

impl WorkloadSnapshot {
    /// Counts completed and pending files per agent, in roster order
    ///
    /// Files assigned to agents outside the roster are ignored.
    pub fn build(agents: &[Agent], files: &[FileRecord]) -> Self {
        let mut workloads: Vec<AgentWorkload> = agents.iter().map(AgentWorkload::for_agent).collect();
        let index: HashMap<&str, usize> = agents
            .iter()
            .enumerate()
            .map(|(i, agent)| (agent.id.as_str(), i))
            .collect();

        for file in files {
            let Some(agent_id) = file.assigned_agent_id.as_deref() else {
                continue;
            };
            if let Some(&i) = index.get(agent_id) {
                workloads[i].record(file.status);
            }
        }

        Self { workloads }
    }

    /// Workload records in roster order
    pub fn workloads(&self) -> &[AgentWorkload] {
        &self.workloads
    }

    /// Only the records eligible for new work
    pub fn active(&self) -> impl Iterator<Item = &AgentWorkload> {
        self.workloads.iter().filter(|w| w.is_active)
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentWorkload> {
        self.workloads.iter().find(|w| w.agent_id == agent_id)
    }

    pub fn into_inner(self) -> Vec<AgentWorkload> {
        self.workloads
    }
}

impl From<Vec<AgentWorkload>> for WorkloadSnapshot {
    fn from(workloads: Vec<AgentWorkload>) -> Self {
        Self { workloads }
    }
}
