use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::file::{FileAssignmentUpdate, FileRecord, FileStatus};
use crate::domain::repositories::{FileFilter, FilePage, FileRepository};

#[derive(sqlx::FromRow)]
struct FileRow {
    id: String,
    owner_id: Option<String>,
    assigned_agent_id: Option<String>,
    status: Option<String>,
    assigned_at: Option<DateTime<Utc>>,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        let status = match row.status.as_deref() {
            None | Some("") => FileStatus::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(file_id = %row.id, error = %e, "Unreadable file status, treating as pending payment");
                FileStatus::default()
            }),
        };

        Self {
            id: row.id,
            owner_id: row.owner_id,
            assigned_agent_id: row.assigned_agent_id.filter(|a| !a.is_empty()),
            status,
            assigned_at: row.assigned_at,
        }
    }
}

const FILE_COLUMNS: &str = "id, owner_id, assigned_agent_id, status, assigned_at";

/// PostgreSQL implementation of FileRepository
pub struct PostgresFileRepository {
    pool: PgPool,
}

impl PostgresFileRepository {
    /// Creates a new PostgresFileRepository
    ///
    /// # Arguments
    /// * `pool` - SQLx connection pool for PostgreSQL
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &FileFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(agent_id) = &filter.agent_id {
        builder.push(" AND assigned_agent_id = ").push_bind(agent_id.clone());
    }
    if let Some(owner_id) = &filter.owner_id {
        builder.push(" AND owner_id = ").push_bind(owner_id.clone());
    }
}

#[async_trait]
impl FileRepository for PostgresFileRepository {
    async fn find_all(&self) -> Result<Vec<FileRecord>, String> {
        let rows: Vec<FileRow> =
            sqlx::query_as(&format!("SELECT {} FROM files ORDER BY created_at", FILE_COLUMNS))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| format!("Failed to load files: {}", e))?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn find_unassigned(&self, limit: Option<usize>) -> Result<Vec<FileRecord>, String> {
        let limit = limit.map(|l| l.min(i64::MAX as usize) as i64);
        let rows: Vec<FileRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM files
            WHERE status = 'paid'
              AND (assigned_agent_id IS NULL OR assigned_agent_id = '')
            ORDER BY created_at
            LIMIT $1
            "#,
            FILE_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to find unassigned files: {}", e))?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<FileRecord>, String> {
        let rows: Vec<FileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM files WHERE id = ANY($1)",
            FILE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to find files by id: {}", e))?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn list(&self, filter: &FileFilter) -> Result<FilePage, String> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM files");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| format!("Failed to count files: {}", e))?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM files", FILE_COLUMNS));
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(filter.page_size()))
            .push(" OFFSET ")
            .push_bind(filter.offset() as i64);

        let rows: Vec<FileRow> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| format!("Failed to list files: {}", e))?;

        Ok(FilePage {
            items: rows.into_iter().map(FileRecord::from).collect(),
            page: filter.page(),
            page_size: filter.page_size(),
            total: total.max(0) as u64,
        })
    }

    async fn apply_assignments(&self, batch: &[FileAssignmentUpdate]) -> Result<(), String> {
        if batch.is_empty() {
            return Ok(());
        }

        let file_ids: Vec<String> = batch.iter().map(|u| u.file_id.clone()).collect();
        let agent_ids: Vec<String> = batch.iter().map(|u| u.agent_id.clone()).collect();
        let statuses: Vec<&str> = batch.iter().map(|u| u.status.as_str()).collect();
        let assigned_at: Vec<DateTime<Utc>> = batch.iter().map(|u| u.assigned_at).collect();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| format!("Failed to open transaction: {}", e))?;

        let result = sqlx::query(
            r#"
            UPDATE files AS f SET
                assigned_agent_id = u.agent_id,
                status = u.status,
                assigned_at = u.assigned_at
            FROM UNNEST($1::text[], $2::text[], $3::text[], $4::timestamptz[])
                AS u(file_id, agent_id, status, assigned_at)
            WHERE f.id = u.file_id
            "#,
        )
        .bind(&file_ids)
        .bind(&agent_ids)
        .bind(&statuses)
        .bind(&assigned_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| format!("Failed to apply assignment batch: {}", e))?;

        if result.rows_affected() != batch.len() as u64 {
            tx.rollback()
                .await
                .map_err(|e| format!("Failed to roll back assignment batch: {}", e))?;
            return Err(format!(
                "Assignment batch matched {} of {} files",
                result.rows_affected(),
                batch.len()
            ));
        }

        tx.commit()
            .await
            .map_err(|e| format!("Failed to commit assignment batch: {}", e))?;

        Ok(())
    }
}
