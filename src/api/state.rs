use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::api::errors::ApiError;
use crate::services::AssignmentService;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AssignmentService>,
    pub jwt_secret: Arc<str>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<AssignmentService>, jwt_secret: &str, request_timeout: Duration) -> Self {
        Self {
            service,
            jwt_secret: Arc::from(jwt_secret),
            request_timeout,
        }
    }

    /// Bounds a read-only call by the configured request timeout
    ///
    /// Never wrap a write path in this: dropping it between batches would
    /// skip cache invalidation and the partial-failure report.
    pub async fn timed<F, T>(&self, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| ApiError::timeout("Request timed out waiting for the document store"))?
    }
}
