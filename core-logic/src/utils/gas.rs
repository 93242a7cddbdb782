//! # Core Logic - Gas Configuration
//!
//! Chain-agnostic gas policy. Chain crates apply these factors to the
//! node's estimate and gas price in their own integer types.

use serde::Deserialize;

/// Configuration for gas management
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GasConfig {
    /// Head-room added on top of `eth_estimateGas`, in percent.
    #[serde(default = "default_limit_buffer_percent")]
    pub limit_buffer_percent: u64,
    /// Factor applied to `eth_gasPrice`.
    #[serde(default = "default_price_multiplier")]
    pub price_multiplier: u64,
}

fn default_limit_buffer_percent() -> u64 {
    1
}

fn default_price_multiplier() -> u64 {
    2
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            limit_buffer_percent: default_limit_buffer_percent(),
            price_multiplier: default_price_multiplier(),
        }
    }
}

impl GasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit_buffer(mut self, percent: u64) -> Self {
        self.limit_buffer_percent = percent;
        self
    }

    pub fn with_price_multiplier(mut self, multiplier: u64) -> Self {
        self.price_multiplier = multiplier;
        self
    }
}
