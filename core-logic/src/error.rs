//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Unified error type for core-logic operations.
///
/// This enum wraps all specific error types and provides a unified
/// error interface for the application layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    #[error(transparent)]
    Wallet(WalletError),

    #[error(transparent)]
    Endpoint(EndpointError),

    #[error(transparent)]
    Transfer(TransferError),

    #[error(transparent)]
    Persistence(PersistenceError),
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

impl From<WalletError> for CoreError {
    fn from(e: WalletError) -> Self {
        CoreError::Wallet(e)
    }
}

impl From<EndpointError> for CoreError {
    fn from(e: EndpointError) -> Self {
        CoreError::Endpoint(e)
    }
}

impl From<TransferError> for CoreError {
    fn from(e: TransferError) -> Self {
        CoreError::Transfer(e)
    }
}

impl From<PersistenceError> for CoreError {
    fn from(e: PersistenceError) -> Self {
        CoreError::Persistence(e)
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid RPC URL format: '{url}'")]
    InvalidRpcUrl { url: String },

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing key material: {0} not set or empty")]
    MissingKeyMaterial(String),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Private key errors
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("Invalid private key format at position {index}: expected hex string")]
    InvalidKeyFormat { index: usize },

    #[error("Private key at position {index} has wrong length: expected 64 hex chars, got {length}")]
    InvalidKeyLength { index: usize, length: usize },
}

/// RPC endpoint connection errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("No RPC endpoints configured")]
    NoEndpoints,

    #[error("RPC endpoint {url} unreachable: {reason}")]
    UnreachableEndpoint { url: String, reason: String },

    #[error("Failed to connect to all {count} RPC endpoints")]
    AllEndpointsExhausted { count: usize },
}

/// Errors raised while moving one batch of one token on-chain.
///
/// Every variant except [`TransferError::BatchTransferFailed`] describes a
/// single failed attempt and is absorbed by the executor's retry budget.
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("Gas estimation failed: {0}")]
    GasEstimationFailed(String),

    #[error("Transaction build failed: {0}")]
    TransactionBuildFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("No receipt for {tx_hash} after {timeout_secs}s")]
    ConfirmationTimeout { tx_hash: String, timeout_secs: u64 },

    #[error("Transaction {tx_hash} reverted")]
    TransactionReverted { tx_hash: String },

    #[error("Batch {batch} of {symbol} failed after {attempts} attempts: {last_error}")]
    BatchTransferFailed {
        symbol: String,
        batch: usize,
        attempts: u32,
        last_error: Box<TransferError>,
    },
}

impl TransferError {
    /// Whether the executor may rotate endpoints and try again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransferError::BatchTransferFailed { .. })
    }

    /// Short state label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::Endpoint(_) => "endpoint",
            TransferError::GasEstimationFailed(_) => "estimate",
            TransferError::TransactionBuildFailed(_) => "build",
            TransferError::SigningFailed(_) => "sign",
            TransferError::SubmissionFailed(_) => "submit",
            TransferError::ConfirmationTimeout { .. } => "confirm_timeout",
            TransferError::TransactionReverted { .. } => "reverted",
            TransferError::BatchTransferFailed { .. } => "exhausted",
        }
    }
}

/// Progress file errors. Never fatal to a run.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write progress file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize progress set: {0}")]
    Serialize(#[from] serde_json::Error),
}
