use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::repositories::{AuditEntry, AuditLogRepository};

/// PostgreSQL implementation of AuditLogRepository (insert-only)
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append(&self, entry: AuditEntry) -> Result<(), String> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, actor, action, details, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.actor)
        .bind(&entry.action)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to append audit entry: {}", e))?;

        Ok(())
    }
}
