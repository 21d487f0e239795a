// Application services
// Orchestrate domain logic over the repository ports

pub mod assignment_service;

pub use assignment_service::AssignmentService;
