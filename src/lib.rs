//! DocDesk API Library
//!
//! Admin backend for a document-processing service: the workload-balanced
//! file assignment engine, the bounded response cache that keeps dashboard
//! queries cheap, and the repository and HTTP adapters around them.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod services;
