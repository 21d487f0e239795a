use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use docdesk_api::api::{self, AppState};
use docdesk_api::cache::ResponseCache;
use docdesk_api::config::AppConfig;
use docdesk_api::domain::repositories::{AgentRepository, AuditLogRepository, FileRepository};
use docdesk_api::infrastructure::repositories::{
    InMemoryStore, PostgresAgentRepository, PostgresAuditLogRepository, PostgresFileRepository,
};
use docdesk_api::services::AssignmentService;

type Repositories = (
    Arc<dyn AgentRepository>,
    Arc<dyn FileRepository>,
    Arc<dyn AuditLogRepository>,
);

async fn connect_repositories(config: &AppConfig) -> Result<Repositories, String> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using in-memory store");
        let store = InMemoryStore::new();
        return Ok((
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
        ));
    };

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.request_timeout)
        .connect(database_url)
        .await
        .map_err(|e| format!("Failed to connect to database: {}", e))?;
    tracing::info!("Database connected successfully");

    Ok((
        Arc::new(PostgresAgentRepository::new(pool.clone())),
        Arc::new(PostgresFileRepository::new(pool.clone())),
        Arc::new(PostgresAuditLogRepository::new(pool)),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("docdesk_api=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let (agents, files, audit) = connect_repositories(&config).await?;

    // One cache per process, shared by every handler
    let cache = Arc::new(ResponseCache::new(config.cache_capacity));
    let service = Arc::new(AssignmentService::new(
        agents,
        files,
        audit,
        cache,
        config.assignment.clone(),
    ));

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState::new(service, &config.jwt_secret, config.request_timeout);
    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    tracing::info!(
        addr = %config.listen_addr,
        cache_capacity = config.cache_capacity,
        batch_size = config.assignment.batch_size,
        "Server listening"
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
