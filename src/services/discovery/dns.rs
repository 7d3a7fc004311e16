use async_trait::async_trait;

use super::error::DiscoveryError;

/// DNS 解析能力，按域名返回地址列表
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, domain: &str) -> Result<Vec<String>, DiscoveryError>;
}

// 基于 tokio 的系统解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDnsResolver;

#[async_trait]
impl DnsResolver for SystemDnsResolver {
    async fn resolve(&self, domain: &str) -> Result<Vec<String>, DiscoveryError> {
        let addrs = tokio::net::lookup_host((domain, 0))
            .await
            .map_err(|source| DiscoveryError::Resolve {
                domain: domain.to_string(),
                source,
            })?;

        let hosts = dedup_hosts(addrs.map(|addr| addr.ip().to_string()));

        tracing::debug!(domain = %domain, addresses = ?hosts, "Resolved DNS name");
        Ok(hosts)
    }
}

// 同一地址可能因多种 socket 类型重复出现，保留首次出现的顺序
fn dedup_hosts(hosts: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for host in hosts {
        if !unique.contains(&host) {
            unique.push(host);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_hosts_keeps_first_occurrence() {
        let hosts = vec![
            "10.0.0.2".to_string(),
            "10.0.0.1".to_string(),
            "10.0.0.2".to_string(),
            "::1".to_string(),
            "10.0.0.1".to_string(),
        ];
        assert_eq!(dedup_hosts(hosts), vec!["10.0.0.2", "10.0.0.1", "::1"]);
    }

    #[test]
    fn test_dedup_hosts_empty() {
        assert!(dedup_hosts(Vec::new()).is_empty());
    }
}
