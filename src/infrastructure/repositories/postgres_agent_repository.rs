use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::agent::Agent;
use crate::domain::repositories::AgentRepository;

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    display_name: Option<String>,
    is_active: Option<bool>,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name.unwrap_or_default(),
            is_active: row.is_active.unwrap_or(false),
        }
    }
}

/// PostgreSQL implementation of AgentRepository
///
/// Roster order is creation order, which keeps the engine's final
/// tie-break stable between runs.
pub struct PostgresAgentRepository {
    pool: PgPool,
}

impl PostgresAgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn find_all(&self) -> Result<Vec<Agent>, String> {
        let rows: Vec<AgentRow> = sqlx::query_as(
            "SELECT id, display_name, is_active FROM agents ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to load agents: {}", e))?;

        Ok(rows.into_iter().map(Agent::from).collect())
    }

    async fn find_active(&self) -> Result<Vec<Agent>, String> {
        let rows: Vec<AgentRow> = sqlx::query_as(
            r#"
            SELECT id, display_name, is_active
            FROM agents
            WHERE is_active = TRUE
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to load active agents: {}", e))?;

        Ok(rows.into_iter().map(Agent::from).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Agent>, String> {
        let row: Option<AgentRow> =
            sqlx::query_as("SELECT id, display_name, is_active FROM agents WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| format!("Failed to find agent by id: {}", e))?;

        Ok(row.map(Agent::from))
    }
}
