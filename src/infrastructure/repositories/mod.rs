// Repository implementations (data access layer)
// Adapters that implement domain repository interfaces

pub mod in_memory_store;
pub mod postgres_agent_repository;
pub mod postgres_audit_log_repository;
pub mod postgres_file_repository;

pub use in_memory_store::InMemoryStore;
pub use postgres_agent_repository::PostgresAgentRepository;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_file_repository::PostgresFileRepository;
