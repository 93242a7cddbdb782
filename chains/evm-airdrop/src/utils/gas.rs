use core_logic::GasConfig;
use ethers::types::U256;

/// Applies the configured gas policy to node-reported values.
#[derive(Clone, Copy, Debug, Default)]
pub struct GasManager {
    config: GasConfig,
}

impl GasManager {
    pub fn new(config: GasConfig) -> Self {
        Self { config }
    }

    /// Raw estimate plus the configured head-room (rounds down).
    pub fn buffered_limit(&self, estimate: U256) -> U256 {
        estimate.saturating_mul(U256::from(100 + self.config.limit_buffer_percent)) / 100
    }

    /// Network gas price times the configured multiplier.
    pub fn bumped_price(&self, gas_price: U256) -> U256 {
        gas_price.saturating_mul(U256::from(self.config.price_multiplier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let gas = GasManager::default();
        assert_eq!(gas.buffered_limit(U256::from(100_000)), U256::from(101_000));
        assert_eq!(gas.buffered_limit(U256::from(21_000)), U256::from(21_210));
        assert_eq!(
            gas.bumped_price(U256::from(1_500_000_000u64)),
            U256::from(3_000_000_000u64)
        );
    }

    #[test]
    fn test_custom_policy() {
        let gas = GasManager::new(GasConfig::new().with_limit_buffer(20).with_price_multiplier(1));
        assert_eq!(gas.buffered_limit(U256::from(50)), U256::from(60));
        assert_eq!(gas.bumped_price(U256::from(7)), U256::from(7));
    }
}
