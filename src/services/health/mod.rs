pub mod check;
pub mod error;
pub mod monitor;

pub use check::{HealthCheck, HealthFuture, HealthPredicate};
pub use error::{BoxError, HealthCheckError};
pub use monitor::{CheckOutcome, check_instances};
