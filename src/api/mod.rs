// API layer module (adapters for controllers)
// Follows Hexagonal Architecture - API is an adapter

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{get, post, put},
    Router,
};

use handlers::{assignments, files, health};
pub use state::AppState;

/// Builds the admin router over shared state
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Assignment routes
        .route("/api/admin/assignments", post(assignments::assign_files))
        .route("/api/admin/assignments/auto", post(assignments::auto_assign))
        .route("/api/admin/assignments/stats", get(assignments::get_stats))
        // File routes
        .route("/api/admin/files", get(files::list_files))
        .route("/api/admin/files/:id/assignee", put(files::reassign_file))
        .with_state(state)
}
