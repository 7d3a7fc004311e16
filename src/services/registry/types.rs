use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::services::health::HealthCheck;

// 服务发现方式（注册时经过校验）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    Dns { domain: String },
    Static { hosts: Vec<String> },
    Env { prefix: String },
}

impl DiscoveryStrategy {
    pub fn kind(&self) -> &'static str {
        match self {
            DiscoveryStrategy::Dns { .. } => "dns",
            DiscoveryStrategy::Static { .. } => "static",
            DiscoveryStrategy::Env { .. } => "env",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Initializing,
    Active,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceHealthStatus {
    Unknown,
    Healthy,
    Unhealthy,
}

// 服务实例，每次发现都会重新生成
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub host: String,
    pub status: InstanceHealthStatus,
    pub last_check: Option<SystemTime>,
    pub error: Option<String>,
}

impl Instance {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            status: InstanceHealthStatus::Unknown,
            last_check: None,
            error: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == InstanceHealthStatus::Healthy
    }
}

/// 注册请求中的原始服务参数
///
/// `discovery_type` 等字段保持原始形式，在 `register` 时才校验并转换为
/// [`DiscoveryStrategy`]。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceDetails {
    pub discovery_type: Option<String>,
    pub domain: Option<String>,
    pub env_prefix: Option<String>,
    #[serde(default)]
    pub instances: Vec<String>,
    #[serde(skip)]
    pub health_check: HealthCheck,
}

impl ServiceDetails {
    pub fn dns(domain: impl Into<String>) -> Self {
        Self {
            discovery_type: Some("dns".to_string()),
            domain: Some(domain.into()),
            ..Default::default()
        }
    }

    pub fn static_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            discovery_type: Some("static".to_string()),
            instances: hosts.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn env(prefix: impl Into<String>) -> Self {
        Self {
            discovery_type: Some("env".to_string()),
            env_prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn with_health_check(mut self, health_check: HealthCheck) -> Self {
        self.health_check = health_check;
        self
    }
}

// 注册表中保存的服务描述
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: String,
    pub strategy: DiscoveryStrategy,
    pub instances: Vec<Instance>,
    pub status: ServiceStatus,
    pub last_update: SystemTime,
    pub last_error: Option<String>,
    pub registered_at: SystemTime,
    pub health_check: HealthCheck,
    // 每次注册分配的编号，用于丢弃属于旧注册的发现结果
    pub(crate) registration: u64,
    // 实例列表版本号，实例列表被替换时变化
    pub(crate) generation: u64,
}

impl ServiceDescriptor {
    pub fn healthy_instances(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .filter(|instance| instance.is_healthy())
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> ServiceSummary {
        ServiceSummary {
            name: self.name.clone(),
            instance_count: self.instances.len(),
            healthy_instance_count: self.instances.iter().filter(|i| i.is_healthy()).count(),
            last_update: self.last_update,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSummary {
    pub name: String,
    pub instance_count: usize,
    pub healthy_instance_count: usize,
    pub last_update: SystemTime,
    pub status: ServiceStatus,
}

// getService 的返回值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedInstance {
    pub service_name: String,
    pub instance: Instance,
    pub resolved_at: SystemTime,
}

// 注册表统计信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryStats {
    pub registered_services: usize,
    pub total_instances: usize,
    pub healthy_instances: usize,
}

// 注册表运行配置
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub discovery_interval: Duration,
    pub health_check_interval: Duration,
    // 单次健康检查调用的超时
    pub health_check_timeout: Duration,
    pub dns_timeout: Duration,
    // 后台任务的最大并发数
    pub max_concurrent_jobs: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            discovery_interval: Duration::from_secs(30),
            health_check_interval: Duration::from_secs(10),
            health_check_timeout: Duration::from_secs(5),
            dns_timeout: Duration::from_secs(5),
            max_concurrent_jobs: 32,
        }
    }
}

// 服务名 -> 服务描述
pub type ServiceStore = Arc<DashMap<String, ServiceDescriptor>>;
