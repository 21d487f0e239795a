use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::middleware::AdminAuth;
use crate::api::state::AppState;
use crate::domain::assignment::AssignmentReport;
use crate::domain::stats::AssignmentStats;

/// Request body for a bulk assignment of chosen files
#[derive(Debug, Deserialize)]
pub struct AssignFilesRequest {
    pub file_ids: Vec<String>,
}

/// Request body for distributing every unassigned paid file
#[derive(Debug, Default, Deserialize)]
pub struct AutoAssignRequest {
    pub limit: Option<usize>,
}

/// Distribute the given files across active agents
///
/// POST /api/admin/assignments
///
/// A write-back that stops part way answers 207 with the committed and
/// failed file ids in `details`.
pub async fn assign_files(
    State(state): State<AppState>,
    AdminAuth(admin): AdminAuth,
    Json(req): Json<AssignFilesRequest>,
) -> Result<Json<AssignmentReport>, ApiError> {
    // Store calls are bounded per batch inside the service
    let report = state
        .service
        .assign_files(&admin.sub, req.file_ids)
        .await?;

    Ok(Json(report))
}

/// Distribute every paid file that has no agent yet
///
/// POST /api/admin/assignments/auto
pub async fn auto_assign(
    State(state): State<AppState>,
    AdminAuth(admin): AdminAuth,
    body: Option<Json<AutoAssignRequest>>,
) -> Result<Json<AssignmentReport>, ApiError> {
    let limit = body.and_then(|Json(req)| req.limit);
    let report = state.service.assign_unassigned(&admin.sub, limit).await?;

    Ok(Json(report))
}

/// Assignment statistics for the dashboard
///
/// GET /api/admin/assignments/stats
pub async fn get_stats(
    State(state): State<AppState>,
    AdminAuth(_admin): AdminAuth,
) -> Result<Json<AssignmentStats>, ApiError> {
    let service = state.service.clone();
    let stats = state
        .timed(async move { service.assignment_stats().await.map_err(ApiError::from) })
        .await?;

    Ok(Json(stats))
}
