// Repository interfaces (ports) for the external document store

pub mod agent_repository;
pub mod audit_log_repository;
pub mod file_repository;

pub use agent_repository::AgentRepository;
pub use audit_log_repository::{AuditEntry, AuditLogRepository};
pub use file_repository::{FileFilter, FilePage, FileRepository};
