use std::time::Duration;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum HealthCheckError {
    #[error("Health check failed: {0}")]
    Predicate(#[source] BoxError),

    #[error("Health check timed out after {0:?}")]
    Timeout(Duration),
}
