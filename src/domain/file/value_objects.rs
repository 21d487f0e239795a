use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Represents the lifecycle status of an uploaded file
///
/// # Status Transitions
/// ```text
/// PendingPayment -> Paid -> Assigned -> Processing -> Completed
///        |            |        |  ^
///        |            |        +--+ (reassignment)
///        +------------+--------+---> Cancelled
/// ```
///
/// The assignment engine only ever performs `Paid -> Assigned` (or
/// `Assigned -> Assigned` when an admin overrides the assignee). Processing
/// and completion are driven by the fulfillment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Uploaded, payment not yet confirmed
    #[default]
    PendingPayment,
    /// Paid and waiting for an agent
    Paid,
    /// Handed to an agent, work not started
    Assigned,
    /// Agent is working on the file
    Processing,
    /// Fulfilled
    Completed,
    /// Withdrawn before fulfillment
    Cancelled,
}

impl FileStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Example
    /// ```
    /// use docdesk_api::domain::file::FileStatus;
    ///
    /// assert!(FileStatus::Paid.can_transition_to(FileStatus::Assigned));
    /// assert!(!FileStatus::Completed.can_transition_to(FileStatus::Assigned));
    /// ```
    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        use FileStatus::*;
        matches!(
            (self, next),
            (PendingPayment, Paid)
                | (Paid, Assigned)
                | (Assigned, Assigned)
                | (Assigned, Processing)
                | (Processing, Completed)
                | (PendingPayment, Cancelled)
                | (Paid, Cancelled)
                | (Assigned, Cancelled)
        )
    }

    /// True for statuses that count against an agent's active load
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            FileStatus::Paid | FileStatus::Assigned | FileStatus::Processing
        )
    }

    /// Returns the stored representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::PendingPayment => "pending_payment",
            FileStatus::Paid => "paid",
            FileStatus::Assigned => "assigned",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_payment" => Ok(FileStatus::PendingPayment),
            "paid" => Ok(FileStatus::Paid),
            "assigned" => Ok(FileStatus::Assigned),
            "processing" => Ok(FileStatus::Processing),
            "completed" => Ok(FileStatus::Completed),
            "cancelled" => Ok(FileStatus::Cancelled),
            other => Err(format!("Unknown file status: {}", other)),
        }
    }
}
