//! Instance discovery
//!
//! Resolves the current instance list of a service from its
//! [`DiscoveryStrategy`]:
//! - `dns`: addresses returned by a [`DnsResolver`]
//! - `static`: the host list supplied at registration
//! - `env`: values of environment entries matching a key prefix

pub mod dns;
pub mod env;
pub mod error;

use std::sync::Arc;
use std::time::Duration;

use crate::services::registry::types::{DiscoveryStrategy, Instance};

pub use dns::{DnsResolver, SystemDnsResolver};
pub use env::{EnvSource, ProcessEnv};
pub use error::DiscoveryError;

#[derive(Clone)]
pub struct Discoverer {
    resolver: Arc<dyn DnsResolver>,
    env: Arc<dyn EnvSource>,
    dns_timeout: Duration,
}

impl Discoverer {
    pub fn new(
        resolver: Arc<dyn DnsResolver>,
        env: Arc<dyn EnvSource>,
        dns_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            env,
            dns_timeout,
        }
    }

    /// 执行一次发现，成功时返回全新的实例列表（状态均为 unknown）
    pub async fn discover(&self, strategy: &DiscoveryStrategy) -> Result<Vec<Instance>, DiscoveryError> {
        let hosts = match strategy {
            DiscoveryStrategy::Dns { domain } => self.resolve_dns(domain).await?,
            DiscoveryStrategy::Static { hosts } => hosts.clone(),
            DiscoveryStrategy::Env { prefix } => env::scan_prefix(self.env.as_ref(), prefix),
        };

        Ok(hosts.into_iter().map(Instance::new).collect())
    }

    async fn resolve_dns(&self, domain: &str) -> Result<Vec<String>, DiscoveryError> {
        let hosts = tokio::time::timeout(self.dns_timeout, self.resolver.resolve(domain))
            .await
            .map_err(|_| DiscoveryError::Timeout {
                domain: domain.to_string(),
                timeout: self.dns_timeout,
            })??;

        if hosts.is_empty() {
            return Err(DiscoveryError::NoAddresses {
                domain: domain.to_string(),
            });
        }

        Ok(hosts)
    }
}
