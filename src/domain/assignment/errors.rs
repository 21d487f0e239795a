use thiserror::Error;

use super::report::AssignmentReport;

/// Errors that can occur while planning or persisting an assignment
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// Empty or malformed file list; the caller's fault, never retried
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No active agent can receive work
    #[error("No eligible agents: activate an agent before assigning files")]
    NoEligibleAgents,

    /// Some write batches committed, later ones failed
    #[error("Partial write failure: {reason} ({})", .report.summary())]
    PartialWriteFailure {
        report: Box<AssignmentReport>,
        reason: String,
    },

    /// The store could not be reached; safe to retry with backoff
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AssignmentError {
    /// True for errors raised before any write was attempted
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            AssignmentError::InvalidArgument(_) | AssignmentError::NoEligibleAgents
        )
    }

    /// The partial result carried by a write-stage failure
    pub fn partial_report(&self) -> Option<&AssignmentReport> {
        match self {
            AssignmentError::PartialWriteFailure { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }
}

pub type AssignmentResult<T> = Result<T, AssignmentError>;
