//! # Utilities Module
//!
//! Shared building blocks for chain crates: endpoint failover, retry,
//! gas policy, key loading and logging.

pub mod endpoint_pool;
pub mod gas;
pub mod keys;
pub mod logger;
pub mod retry;

pub use endpoint_pool::{Endpoint, EndpointPool, EndpointStatus, RpcHealthStatus};
pub use gas::GasConfig;
pub use keys::{KeyProvider, PrivateKey};
pub use logger::setup_logger;
pub use retry::{with_retry, RetryConfig};
