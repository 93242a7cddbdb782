//! # EVM Airdrop
//!
//! Batch distribution of ERC-20 style tokens through an `AirdropBatch`
//! contract call, resumable across restarts.
//!
//! ## Modules
//!
//! - [`config`] - File + environment configuration
//! - [`ledger`] - Contract bindings, RPC seam and token resolution
//! - [`planner`] - Address validation and batching
//! - [`source`] - CSV address source
//! - [`executor`] - Per-batch transfer state machine
//! - [`orchestrator`] - Run driver
//! - [`notifier`] - Telegram notifications

pub mod config;
pub mod executor;
pub mod ledger;
pub mod notifier;
pub mod orchestrator;
pub mod planner;
pub mod source;
pub mod utils;

pub use config::AirdropConfig;
pub use executor::{TransferExecutor, TransferOutcome, TransferState};
pub use ledger::{rebind, HttpConnector, LedgerClient, TokenContext, TokenTarget};
pub use notifier::{NoopNotifier, TelegramNotifier};
pub use orchestrator::{Orchestrator, RunSummary};
pub use planner::{partition, plan, Batch, Plan, PlanStats};
