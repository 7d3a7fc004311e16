use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::services::registry::{RegistryConfig, ServiceDetails};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const ENV_PREFIX: &str = "REGISTRY_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid environment override: {0}")]
    Env(#[from] envy::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub discovery_interval_secs: u64,
    pub health_check_interval_secs: u64,
    pub health_check_timeout_ms: u64,
    pub dns_timeout_ms: u64,
    pub max_concurrent_jobs: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            discovery_interval_secs: 30,
            health_check_interval_secs: 10,
            health_check_timeout_ms: 5000,
            dns_timeout_ms: 5000,
            max_concurrent_jobs: 32,
        }
    }
}

// 配置文件中声明的服务
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(flatten)]
    pub details: ServiceDetails,
    // 设置后使用 TCP 连接检查实例健康
    #[serde(default)]
    pub tcp_health_port: Option<u16>,
}

// REGISTRY_* 环境变量覆盖项
#[derive(Debug, Default, Deserialize)]
struct RegistryOverrides {
    discovery_interval_secs: Option<u64>,
    health_check_interval_secs: Option<u64>,
    health_check_timeout_ms: Option<u64>,
    dns_timeout_ms: Option<u64>,
    max_concurrent_jobs: Option<usize>,
}

impl Config {
    /// 读取 `REGISTRY_CONFIG` 指定的文件（默认 config.toml），文件不存在时使用默认配置
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("REGISTRY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::load_from(&path)?
        } else {
            tracing::info!(path = %path, "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path)?;
        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_str)?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let overrides: RegistryOverrides = envy::prefixed(ENV_PREFIX).from_env()?;
        self.apply_overrides(overrides);
        Ok(())
    }

    pub fn apply_overrides_from<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides: RegistryOverrides = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        self.apply_overrides(overrides);
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: RegistryOverrides) {
        let settings = &mut self.registry;
        if let Some(v) = overrides.discovery_interval_secs {
            settings.discovery_interval_secs = v;
        }
        if let Some(v) = overrides.health_check_interval_secs {
            settings.health_check_interval_secs = v;
        }
        if let Some(v) = overrides.health_check_timeout_ms {
            settings.health_check_timeout_ms = v;
        }
        if let Some(v) = overrides.dns_timeout_ms {
            settings.dns_timeout_ms = v;
        }
        if let Some(v) = overrides.max_concurrent_jobs {
            settings.max_concurrent_jobs = v;
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        let settings = &self.registry;
        RegistryConfig {
            discovery_interval: Duration::from_secs(settings.discovery_interval_secs.max(1)),
            health_check_interval: Duration::from_secs(settings.health_check_interval_secs.max(1)),
            health_check_timeout: Duration::from_millis(settings.health_check_timeout_ms.max(1)),
            dns_timeout: Duration::from_millis(settings.dns_timeout_ms.max(1)),
            max_concurrent_jobs: settings.max_concurrent_jobs.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[registry]
discovery_interval_secs = 60
health_check_timeout_ms = 1500

[[services]]
name = "billing"
discovery_type = "dns"
domain = "billing.internal"
tcp_health_port = 8080

[[services]]
name = "cache"
discovery_type = "static"
instances = ["10.0.0.1:6379", "10.0.0.2:6379"]

[[services]]
name = "workers"
discovery_type = "env"
env_prefix = "WORKER_"
"#;

    #[test]
    fn test_parse_config() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.registry.discovery_interval_secs, 60);
        assert_eq!(config.registry.health_check_interval_secs, 10);
        assert_eq!(config.services.len(), 3);

        let billing = &config.services[0];
        assert_eq!(billing.name, "billing");
        assert_eq!(billing.details.discovery_type.as_deref(), Some("dns"));
        assert_eq!(billing.details.domain.as_deref(), Some("billing.internal"));
        assert_eq!(billing.tcp_health_port, Some(8080));

        let cache = &config.services[1];
        assert_eq!(cache.details.instances, vec!["10.0.0.1:6379", "10.0.0.2:6379"]);
        assert_eq!(cache.details.domain, None);
        assert_eq!(cache.details.env_prefix, None);
        assert_eq!(cache.tcp_health_port, None);

        assert_eq!(config.services[2].details.env_prefix.as_deref(), Some("WORKER_"));
        assert!(config.services[2].details.instances.is_empty());
    }

    #[test]
    fn test_registry_config_conversion() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let registry = config.registry_config();
        assert_eq!(registry.discovery_interval, Duration::from_secs(60));
        assert_eq!(registry.health_check_interval, Duration::from_secs(10));
        assert_eq!(registry.health_check_timeout, Duration::from_millis(1500));
        assert_eq!(registry.max_concurrent_jobs, 32);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.services.is_empty());
        let registry = config.registry_config();
        assert_eq!(registry.discovery_interval, Duration::from_secs(30));
        assert_eq!(registry.health_check_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides_from(vec![
                ("REGISTRY_DISCOVERY_INTERVAL_SECS".to_string(), "5".to_string()),
                ("REGISTRY_MAX_CONCURRENT_JOBS".to_string(), "4".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ])
            .unwrap();
        assert_eq!(config.registry.discovery_interval_secs, 5);
        assert_eq!(config.registry.max_concurrent_jobs, 4);
        assert_eq!(config.registry.health_check_interval_secs, 10);

        let err = config.apply_overrides_from(vec![(
            "REGISTRY_DNS_TIMEOUT_MS".to_string(),
            "soon".to_string(),
        )]);
        assert!(matches!(err, Err(ConfigError::Env(_))));
    }
}
