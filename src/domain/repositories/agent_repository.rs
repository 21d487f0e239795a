use async_trait::async_trait;

use crate::domain::agent::Agent;

/// Repository trait for the agent roster
///
/// Read-only from the assignment backend's point of view; agents are
/// created and (de)activated elsewhere in the dashboard.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Find every agent, active or not, in a stable roster order
    async fn find_all(&self) -> Result<Vec<Agent>, String>;

    /// Find only agents eligible for new assignments
    async fn find_active(&self) -> Result<Vec<Agent>, String>;

    /// Find an agent by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Agent>, String>;
}
