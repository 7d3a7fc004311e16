use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to resolve {domain}: {source}")]
    Resolve {
        domain: String,
        #[source]
        source: std::io::Error,
    },

    #[error("DNS lookup for {domain} timed out after {timeout:?}")]
    Timeout { domain: String, timeout: Duration },

    #[error("DNS lookup for {domain} returned no addresses")]
    NoAddresses { domain: String },
}
