use dashmap::{DashMap, DashSet};
use futures::future::join_all;
use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::error::{RegistryError, Result};
use super::scheduler::JobKind;
use super::types::{
    DiscoveryStrategy, Instance, RegistryConfig, RegistryStats, ResolvedInstance,
    ServiceDescriptor, ServiceDetails, ServiceStatus, ServiceStore, ServiceSummary,
};
use crate::services::discovery::{Discoverer, DnsResolver, EnvSource, ProcessEnv, SystemDnsResolver};
use crate::services::health::check_instances;

/// 服务注册表
///
/// 克隆开销很小，所有克隆共享同一份状态。后台发现与健康检查循环由
/// [`ServiceRegistry::start`] 启动，由 [`ServiceRegistry::stop`] 停止。
#[derive(Clone)]
pub struct ServiceRegistry {
    pub(super) services: ServiceStore,
    pub(super) config: RegistryConfig,
    pub(super) discoverer: Discoverer,
    // 注册编号与实例列表版本号共用的计数器
    tokens: Arc<AtomicU64>,
    pub(super) task_tracker: Arc<TaskTracker>,
    pub(super) shutdown: CancellationToken,
    pub(super) job_permits: Arc<Semaphore>,
    pub(super) in_flight: Arc<DashSet<(JobKind, String)>>,
    pub(super) started: Arc<AtomicBool>,
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services.len())
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl ServiceRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_sources(config, Arc::new(SystemDnsResolver), Arc::new(ProcessEnv))
    }

    /// 使用指定的 DNS 解析器和环境变量来源创建注册表
    pub fn with_sources(
        config: RegistryConfig,
        resolver: Arc<dyn DnsResolver>,
        env: Arc<dyn EnvSource>,
    ) -> Self {
        let discoverer = Discoverer::new(resolver, env, config.dns_timeout);
        let permits = config.max_concurrent_jobs.max(1);

        Self {
            services: Arc::new(DashMap::new()),
            discoverer,
            tokens: Arc::new(AtomicU64::new(1)),
            task_tracker: Arc::new(TaskTracker::new()),
            shutdown: CancellationToken::new(),
            job_permits: Arc::new(Semaphore::new(permits)),
            in_flight: Arc::new(DashSet::new()),
            started: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn next_token(&self) -> u64 {
        self.tokens.fetch_add(1, Ordering::Relaxed)
    }

    /// 注册服务，校验通过后立即执行一次发现
    ///
    /// 发现失败不会导致注册失败，服务状态会被置为 `error`。
    pub async fn register(&self, name: impl Into<String>, details: ServiceDetails) -> Result<()> {
        let name = name.into();
        let strategy = validate_registration(&name, &details)?;
        let registration = self.next_token();
        let now = SystemTime::now();

        tracing::info!(
            service_name = %name,
            discovery_type = strategy.kind(),
            health_check = details.health_check.is_enabled(),
            "Registering service"
        );

        let descriptor = ServiceDescriptor {
            name: name.clone(),
            strategy,
            instances: Vec::new(),
            status: ServiceStatus::Initializing,
            last_update: now,
            last_error: None,
            registered_at: now,
            health_check: details.health_check,
            registration,
            generation: registration,
        };

        if self.services.insert(name.clone(), descriptor).is_some() {
            tracing::info!(service_name = %name, "Replaced existing service registration");
        }

        self.discover_service(&name).await;
        Ok(())
    }

    /// 立即对指定服务执行一次发现
    pub async fn refresh_service(&self, name: &str) -> Result<()> {
        if self.discover_service(name).await {
            Ok(())
        } else {
            Err(RegistryError::NotFound(name.to_string()))
        }
    }

    /// 立即对指定服务执行一次健康检查
    pub async fn check_service_health(&self, name: &str) -> Result<()> {
        if self.check_health(name).await {
            Ok(())
        } else {
            Err(RegistryError::NotFound(name.to_string()))
        }
    }

    /// 对所有服务并发执行一次发现并等待完成
    pub async fn run_discovery_pass(&self) {
        let names = self.service_names();
        join_all(names.iter().map(|name| self.discover_service(name))).await;
    }

    /// 对所有服务并发执行一次健康检查并等待完成
    pub async fn run_health_pass(&self) {
        let names = self.service_names();
        join_all(names.iter().map(|name| self.check_health(name))).await;
    }

    // 服务不存在时返回 false
    pub(super) async fn discover_service(&self, name: &str) -> bool {
        let Some((strategy, registration)) = self
            .services
            .get(name)
            .map(|entry| (entry.strategy.clone(), entry.registration))
        else {
            return false;
        };

        let result = self.discoverer.discover(&strategy).await;
        let generation = self.next_token();

        let Some(mut entry) = self.services.get_mut(name) else {
            return false;
        };
        if entry.registration != registration {
            tracing::debug!(
                service_name = %name,
                "Discarding discovery result for a superseded registration"
            );
            return true;
        }

        entry.last_update = SystemTime::now();
        match result {
            Ok(instances) => {
                if entry.status != ServiceStatus::Active {
                    tracing::info!(
                        service_name = %name,
                        instance_count = instances.len(),
                        "Service discovery succeeded"
                    );
                } else {
                    tracing::debug!(
                        service_name = %name,
                        instance_count = instances.len(),
                        "Refreshed service instances"
                    );
                }
                entry.instances = instances;
                entry.generation = generation;
                entry.status = ServiceStatus::Active;
                entry.last_error = None;
            }
            Err(e) => {
                tracing::warn!(
                    service_name = %name,
                    error = %e,
                    retained_instances = entry.instances.len(),
                    "Service discovery failed, keeping previous instances"
                );
                entry.status = ServiceStatus::Error;
                entry.last_error = Some(e.to_string());
            }
        }

        true
    }

    // 服务不存在时返回 false
    pub(super) async fn check_health(&self, name: &str) -> bool {
        let Some((predicate, instances, generation)) = self.services.get(name).map(|entry| {
            (
                entry.health_check.predicate().cloned(),
                entry.instances.clone(),
                entry.generation,
            )
        }) else {
            return false;
        };

        let Some(predicate) = predicate else {
            tracing::debug!(service_name = %name, "No health check registered, skipping");
            return true;
        };
        if instances.is_empty() {
            return true;
        }

        let outcomes = check_instances(
            &predicate,
            name,
            &instances,
            self.config.health_check_timeout,
        )
        .await;

        let Some(mut entry) = self.services.get_mut(name) else {
            return false;
        };
        // 检查期间实例列表已被替换，结果作废
        if entry.generation != generation {
            tracing::debug!(
                service_name = %name,
                "Instance list changed during health check, discarding results"
            );
            return true;
        }

        for (instance, outcome) in entry.instances.iter_mut().zip(outcomes) {
            instance.status = outcome.status;
            instance.last_check = Some(outcome.checked_at);
            instance.error = outcome.error;
        }

        tracing::debug!(
            service_name = %name,
            healthy = entry.instances.iter().filter(|i| i.is_healthy()).count(),
            total = entry.instances.len(),
            "Health check pass completed"
        );

        true
    }

    /// 从健康实例中随机选取一个
    pub fn get_service(&self, name: &str) -> Result<ResolvedInstance> {
        let entry = self
            .services
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        let healthy: Vec<&Instance> = entry.instances.iter().filter(|i| i.is_healthy()).collect();
        let instance = healthy
            .choose(&mut rand::thread_rng())
            .map(|instance| (*instance).clone())
            .ok_or_else(|| RegistryError::NoHealthyInstance(name.to_string()))?;

        Ok(ResolvedInstance {
            service_name: name.to_string(),
            instance,
            resolved_at: SystemTime::now(),
        })
    }

    // 所有服务的摘要，按名称排序
    pub fn get_all_services(&self) -> Vec<ServiceSummary> {
        let mut summaries: Vec<ServiceSummary> = self
            .services
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    // 获取服务信息
    pub fn get_service_info(&self, name: &str) -> Option<ServiceDescriptor> {
        self.services.get(name).map(|entry| entry.value().clone())
    }

    pub fn get_healthy_instances(&self, name: &str) -> Result<Vec<Instance>> {
        self.services
            .get(name)
            .map(|entry| entry.healthy_instances())
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for entry in self.services.iter() {
            stats.registered_services += 1;
            stats.total_instances += entry.instances.len();
            stats.healthy_instances += entry.instances.iter().filter(|i| i.is_healthy()).count();
        }
        stats
    }

    pub(super) fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|entry| entry.key().clone()).collect()
    }
}

// 校验注册参数并转换为发现方式
pub(crate) fn validate_registration(name: &str, details: &ServiceDetails) -> Result<DiscoveryStrategy> {
    if name.trim().is_empty() {
        return Err(RegistryError::Validation("service name must not be empty".to_string()));
    }

    let discovery_type = details.discovery_type.as_deref().ok_or_else(|| {
        RegistryError::Validation(format!("discovery type is required for service {name}"))
    })?;

    match discovery_type {
        "dns" => {
            let domain = non_empty(details.domain.as_deref()).ok_or_else(|| {
                RegistryError::Validation(format!("domain is required for DNS discovery of service {name}"))
            })?;
            Ok(DiscoveryStrategy::Dns { domain })
        }
        "static" => Ok(DiscoveryStrategy::Static {
            hosts: details.instances.clone(),
        }),
        "env" => {
            let prefix = non_empty(details.env_prefix.as_deref()).ok_or_else(|| {
                RegistryError::Validation(format!("env prefix is required for env discovery of service {name}"))
            })?;
            Ok(DiscoveryStrategy::Env { prefix })
        }
        other => Err(RegistryError::Validation(format!(
            "invalid discovery type '{other}' for service {name}"
        ))),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
