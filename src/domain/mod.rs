// Domain layer module exports
// Following Hexagonal Architecture and DDD principles
// Domain is independent of infrastructure concerns

pub mod agent;
pub mod assignment;
pub mod file;
pub mod repositories;
pub mod stats;
