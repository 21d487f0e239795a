// Assignment domain module
//
// Workload-balanced distribution of paid files over the active agent pool,
// plus the plan, report and audit event types built around it.

pub mod engine;
pub mod errors;
pub mod events;
pub mod plan;
pub mod report;

pub use engine::plan_assignments;
pub use errors::{AssignmentError, AssignmentResult};
pub use events::AssignmentEvent;
pub use plan::{AssignmentPlan, PlannedAssignment};
pub use report::AssignmentReport;
