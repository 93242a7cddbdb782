//! # Core Logic - Shared Utilities for Batch Distribution
//!
//! Chain-agnostic pieces of the airdrop engine: RPC endpoint failover,
//! durable progress tracking, retry policy, typed errors and logging.
//!
//! ## Modules
//!
//! - [`config`] - Configuration structures shared by chain crates
//! - [`error`] - Typed error handling with thiserror
//! - [`metrics`] - Run metrics collection
//! - [`progress`] - Durable set of already-paid addresses
//! - [`traits`] - Connector and notifier seams
//! - [`utils`] - Endpoint pool, retry, gas, keys, logger

pub mod config;
pub mod error;
pub mod metrics;
pub mod progress;
pub mod traits;
pub mod utils;

pub use config::{CommitPolicy, TelegramConfig, TokenConfig, TransferSettings};
pub use error::{
    ConfigError, CoreError, EndpointError, PersistenceError, TransferError, WalletError,
};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use progress::ProgressStore;
pub use traits::{Connector, Notifier, NotifyEvent};
pub use utils::{
    setup_logger, with_retry, EndpointPool, EndpointStatus, GasConfig, KeyProvider, PrivateKey,
    RetryConfig,
};
