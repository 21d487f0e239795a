// Infrastructure layer module
// Store adapters: PostgreSQL for deployments, in-memory for local runs and tests

pub mod repositories;
