pub mod discovery;
pub mod health;
pub mod registry;

pub use discovery::{DiscoveryError, DnsResolver, EnvSource};
pub use health::{HealthCheck, HealthCheckError};
pub use registry::{
    Instance, InstanceHealthStatus, RegistryConfig, RegistryError, ResolvedInstance,
    ServiceDetails, ServiceRegistry, ServiceStatus, ServiceSummary,
};
