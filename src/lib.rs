pub mod config;
pub mod services;

pub use config::{Config, ConfigError};
pub use services::{
    HealthCheck, Instance, InstanceHealthStatus, RegistryConfig, RegistryError, ResolvedInstance,
    ServiceDetails, ServiceRegistry, ServiceStatus, ServiceSummary,
};
