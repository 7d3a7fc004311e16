#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use service_registry::RegistryConfig;
use service_registry::ServiceRegistry;
use service_registry::services::discovery::{DiscoveryError, DnsResolver};

/// 可在测试中切换应答的 DNS 解析器，`None` 表示解析失败
#[derive(Debug, Default)]
pub struct MockResolver {
    answer: Mutex<Option<Vec<String>>>,
    delay: Mutex<Option<Duration>>,
}

impl MockResolver {
    pub fn answering(hosts: &[&str]) -> Arc<Self> {
        let resolver = Self::default();
        resolver.set_answer(hosts);
        Arc::new(resolver)
    }

    pub fn set_answer(&self, hosts: &[&str]) {
        *self.answer.lock().unwrap() = Some(hosts.iter().map(|h| h.to_string()).collect());
    }

    pub fn fail(&self) {
        *self.answer.lock().unwrap() = None;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl DnsResolver for MockResolver {
    async fn resolve(&self, domain: &str) -> Result<Vec<String>, DiscoveryError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let answer = self.answer.lock().unwrap().clone();
        answer.ok_or_else(|| DiscoveryError::Resolve {
            domain: domain.to_string(),
            source: std::io::Error::other("SERVFAIL"),
        })
    }
}

pub fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn registry_with(
    config: RegistryConfig,
    resolver: Arc<MockResolver>,
    env_vars: HashMap<String, String>,
) -> ServiceRegistry {
    ServiceRegistry::with_sources(config, resolver, Arc::new(env_vars))
}

pub fn test_registry(resolver: Arc<MockResolver>) -> ServiceRegistry {
    registry_with(RegistryConfig::default(), resolver, HashMap::new())
}
