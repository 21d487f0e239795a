// Agent domain module
// Contains the agent roster record and the per-agent workload snapshot

#![allow(clippy::module_inception)]

pub mod agent;
pub mod workload;

pub use agent::Agent;
pub use workload::{AgentWorkload, WorkloadSnapshot};
