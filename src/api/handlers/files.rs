use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::middleware::AdminAuth;
use crate::api::state::AppState;
use crate::domain::file::FileRecord;
use crate::domain::repositories::{FileFilter, FilePage};

/// Request body for a manual assignee override
#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub agent_id: String,
}

/// Filtered, paginated file listing
///
/// GET /api/admin/files?status=&agent_id=&owner_id=&page=&page_size=
pub async fn list_files(
    State(state): State<AppState>,
    AdminAuth(_admin): AdminAuth,
    Query(filter): Query<FileFilter>,
) -> Result<Json<FilePage>, ApiError> {
    let service = state.service.clone();
    let page = state
        .timed(async move { service.list_files(&filter).await.map_err(ApiError::from) })
        .await?;

    Ok(Json(page))
}

/// Point a single file at a specific agent
///
/// PUT /api/admin/files/:id/assignee
pub async fn reassign_file(
    State(state): State<AppState>,
    AdminAuth(admin): AdminAuth,
    Path(file_id): Path<String>,
    Json(req): Json<ReassignRequest>,
) -> Result<Json<FileRecord>, ApiError> {
    let file = state
        .service
        .reassign_file(&admin.sub, &file_id, &req.agent_id)
        .await?;

    Ok(Json(file))
}
