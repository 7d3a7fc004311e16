use futures::future::join_all;
use std::time::{Duration, SystemTime};

use super::check::HealthPredicate;
use super::error::HealthCheckError;
use crate::services::registry::types::{Instance, InstanceHealthStatus};

// 单个实例的检查结果
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub status: InstanceHealthStatus,
    pub error: Option<String>,
    pub checked_at: SystemTime,
}

/// 并发检查所有实例，结果顺序与输入一致
pub async fn check_instances(
    predicate: &HealthPredicate,
    service_name: &str,
    instances: &[Instance],
    timeout: Duration,
) -> Vec<CheckOutcome> {
    let checks = instances
        .iter()
        .map(|instance| check_instance(predicate, service_name, instance.clone(), timeout));
    join_all(checks).await
}

async fn check_instance(
    predicate: &HealthPredicate,
    service_name: &str,
    instance: Instance,
    timeout: Duration,
) -> CheckOutcome {
    let host = instance.host.clone();
    let result = match tokio::time::timeout(timeout, (**predicate)(instance)).await {
        Ok(Ok(healthy)) => Ok(healthy),
        Ok(Err(e)) => Err(HealthCheckError::Predicate(e)),
        Err(_) => Err(HealthCheckError::Timeout(timeout)),
    };
    let checked_at = SystemTime::now();

    match result {
        Ok(true) => {
            tracing::debug!(service_name = %service_name, host = %host, "Instance is healthy");
            CheckOutcome {
                status: InstanceHealthStatus::Healthy,
                error: None,
                checked_at,
            }
        }
        Ok(false) => {
            tracing::debug!(service_name = %service_name, host = %host, "Instance reported unhealthy");
            CheckOutcome {
                status: InstanceHealthStatus::Unhealthy,
                error: None,
                checked_at,
            }
        }
        Err(e) => {
            tracing::warn!(
                service_name = %service_name,
                host = %host,
                error = %e,
                "Health check failed for instance"
            );
            CheckOutcome {
                status: InstanceHealthStatus::Unhealthy,
                error: Some(e.to_string()),
                checked_at,
            }
        }
    }
}
