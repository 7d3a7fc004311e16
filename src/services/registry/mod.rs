//! Registry service module
//!
//! This module contains the service registry implementation split into logical components:
//! - `types`: Data structures and type definitions
//! - `error`: Errors surfaced to registry callers
//! - `service`: Registration, discovery/health passes and instance selection
//! - `scheduler`: Background discovery and health-check loops

pub mod error;
mod scheduler;
pub mod service;
pub mod types;

// Re-export public types for easier access
pub use error::{RegistryError, Result};
pub use service::ServiceRegistry;
pub use types::{
    DiscoveryStrategy, Instance, InstanceHealthStatus, RegistryConfig, RegistryStats,
    ResolvedInstance, ServiceDescriptor, ServiceDetails, ServiceStatus, ServiceSummary,
};
