// Workload-balanced assignment engine
//
// Greedy fairness heuristic: each file goes to the active agent with the
// fewest pending files, ties broken by lower total workload, then by roster
// position. The choice is recomputed after every single placement, so a
// large batch spreads out instead of piling onto whoever looked least
// loaded at the start. Not globally optimal.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use super::errors::{AssignmentError, AssignmentResult};
use super::plan::{AssignmentPlan, PlannedAssignment};
use crate::domain::agent::AgentWorkload;

/// Heap key: (pending, total, roster index). Popping the minimum gives the
/// same agent a stable sort on (pending, total) would put first.
type LoadKey = Reverse<(u32, u32, usize)>;

fn load_key(workload: &AgentWorkload, index: usize) -> LoadKey {
    Reverse((workload.pending_files, workload.total_workload(), index))
}

/// Rejects an empty list, blank ids and duplicate ids
pub fn validate_file_ids(file_ids: &[String]) -> AssignmentResult<()> {
    if file_ids.is_empty() {
        return Err(AssignmentError::InvalidArgument(
            "file_ids must not be empty".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(file_ids.len());
    for file_id in file_ids {
        if file_id.trim().is_empty() {
            return Err(AssignmentError::InvalidArgument(
                "file_ids must not contain blank ids".to_string(),
            ));
        }
        if !seen.insert(file_id.as_str()) {
            return Err(AssignmentError::InvalidArgument(format!(
                "Duplicate file id: {}",
                file_id
            )));
        }
    }

    Ok(())
}

/// Distributes `file_ids` over the active agents in `agents`
///
/// Files are placed in input order. Inactive records are carried through
/// to the returned workloads untouched but never receive work. Re-running
/// with the same inputs yields the same plan.
///
/// # Errors
/// * `InvalidArgument` - empty, blank or duplicate file ids
/// * `NoEligibleAgents` - no active agent in `agents`
///
/// # Example
/// ```
/// use docdesk_api::domain::agent::AgentWorkload;
/// use docdesk_api::domain::assignment::plan_assignments;
///
/// let files = vec!["f1".to_string(), "f2".to_string()];
/// let agents = vec![AgentWorkload::new("a", 0, 1), AgentWorkload::new("b", 0, 0)];
///
/// let plan = plan_assignments(&files, agents).expect("valid plan");
/// assert_eq!(plan.agent_for("f1"), Some("b"));
/// assert_eq!(plan.agent_for("f2"), Some("a"));
/// ```
pub fn plan_assignments(
    file_ids: &[String],
    agents: Vec<AgentWorkload>,
) -> AssignmentResult<AssignmentPlan> {
    validate_file_ids(file_ids)?;

    let mut workloads = agents;
    let mut heap: BinaryHeap<LoadKey> = workloads
        .iter()
        .enumerate()
        .filter(|(_, w)| w.is_active)
        .map(|(i, w)| load_key(w, i))
        .collect();

    if heap.is_empty() {
        return Err(AssignmentError::NoEligibleAgents);
    }

    let mut assignments = Vec::with_capacity(file_ids.len());
    for file_id in file_ids {
        let Some(Reverse((_, _, index))) = heap.pop() else {
            return Err(AssignmentError::NoEligibleAgents);
        };

        let chosen = &mut workloads[index];
        chosen.add_pending();
        assignments.push(PlannedAssignment {
            file_id: file_id.clone(),
            agent_id: chosen.agent_id.clone(),
            pending_files: chosen.pending_files,
            total_workload: chosen.total_workload(),
        });
        heap.push(load_key(chosen, index));
    }

    tracing::debug!(
        files = assignments.len(),
        agents = heap.len(),
        "Assignment plan computed"
    );

    Ok(AssignmentPlan {
        assignments,
        workloads,
    })
}
