//! Ledger bindings: the distribution contract ABI, the RPC operations the
//! executor needs, and per-connection token handles.

use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{with_retry, Connector, EndpointError, RetryConfig, TokenConfig};
use ethers::abi::AbiEncode;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use reqwest::Client;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

ethers::contract::abigen!(
    AirdropToken,
    r#"[
        function name() view returns (string)
        function symbol() view returns (string)
        function decimals() view returns (uint8)
        function totalSupply() view returns (uint256)
        function balanceOf(address account) view returns (uint256)
        function AirdropBatch(address[] recipients, uint256 amount)
    ]"#
);

/// Calldata for `AirdropBatch(recipients, amount)`.
pub fn airdrop_calldata(recipients: &[Address], amount: U256) -> Bytes {
    AirdropBatchCall {
        recipients: recipients.to_vec(),
        amount,
    }
    .encode()
    .into()
}

/// RPC operations used by a transfer attempt, over one connection.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn estimate(&self, tx: &TypedTransaction) -> Result<U256>;
    async fn next_nonce(&self, account: Address) -> Result<U256>;
    async fn network_gas_price(&self) -> Result<U256>;
    async fn submit_raw(&self, raw: Bytes) -> Result<TxHash>;
    async fn fetch_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>>;
    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256>;
}

#[async_trait]
impl LedgerClient for Provider<Http> {
    async fn estimate(&self, tx: &TypedTransaction) -> Result<U256> {
        Ok(Middleware::estimate_gas(self, tx, None).await?)
    }

    async fn next_nonce(&self, account: Address) -> Result<U256> {
        Ok(self
            .get_transaction_count(account, Some(BlockNumber::Pending.into()))
            .await?)
    }

    async fn network_gas_price(&self) -> Result<U256> {
        Ok(self.get_gas_price().await?)
    }

    async fn submit_raw(&self, raw: Bytes) -> Result<TxHash> {
        let pending = self.send_raw_transaction(raw).await?;
        Ok(pending.tx_hash())
    }

    async fn fetch_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>> {
        Ok(self.get_transaction_receipt(tx_hash).await?)
    }

    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256> {
        let contract = AirdropToken::new(token, Arc::new(self.clone()));
        Ok(contract.balance_of(holder).call().await?)
    }
}

/// Opens `Provider<Http>` connections that answer with the expected chain id.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    client: Client,
    chain_id: u64,
}

impl HttpConnector {
    pub fn new(chain_id: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, chain_id })
    }
}

#[async_trait]
impl Connector for HttpConnector {
    type Conn = Provider<Http>;

    async fn connect(&self, url: &str) -> Result<Provider<Http>, EndpointError> {
        let unreachable = |reason: String| EndpointError::UnreachableEndpoint {
            url: url.to_string(),
            reason,
        };

        let parsed: Url = url
            .parse()
            .map_err(|e| unreachable(format!("invalid URL: {}", e)))?;
        let provider = Provider::new(Http::new_with_client(parsed, self.client.clone()));

        match provider.get_chainid().await {
            Ok(id) if id == U256::from(self.chain_id) => Ok(provider),
            Ok(id) => Err(unreachable(format!(
                "chain id {} does not match configured {}",
                id, self.chain_id
            ))),
            Err(e) => Err(unreachable(e.to_string())),
        }
    }

    async fn is_reachable(&self, conn: &Provider<Http>) -> bool {
        conn.get_block_number().await.is_ok()
    }
}

/// A distributable token, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTarget {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    /// Per-recipient amount in base units.
    pub amount: U256,
}

impl TokenTarget {
    pub fn format_units(&self, value: U256) -> String {
        ethers::utils::format_units(value, self.decimals as u32)
            .unwrap_or_else(|_| value.to_string())
    }
}

/// A token target bound to one RPC connection.
#[derive(Debug)]
pub struct TokenBinding<L> {
    pub target: TokenTarget,
    pub client: Arc<L>,
}

/// Token bindings for the current connection, in configured order.
#[derive(Debug)]
pub struct TokenContext<L> {
    bindings: Vec<TokenBinding<L>>,
}

/// Bind every token to `client`. Never mutates an existing context.
pub fn rebind<L>(targets: &[TokenTarget], client: &Arc<L>) -> TokenContext<L> {
    TokenContext {
        bindings: targets
            .iter()
            .map(|target| TokenBinding {
                target: target.clone(),
                client: Arc::clone(client),
            })
            .collect(),
    }
}

impl<L> TokenContext<L> {
    pub fn get(&self, index: usize) -> Option<&TokenBinding<L>> {
        self.bindings.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenBinding<L>> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn targets(&self) -> Vec<TokenTarget> {
        self.bindings.iter().map(|b| b.target.clone()).collect()
    }

    /// True when every binding uses exactly this connection.
    pub fn is_bound_to(&self, client: &Arc<L>) -> bool {
        self.bindings.iter().all(|b| Arc::ptr_eq(&b.client, client))
    }
}

/// Convert a whole-token amount to base units.
pub fn to_base_units(amount: f64, decimals: u8) -> Result<U256> {
    let units = ethers::utils::parse_units(format!("{}", amount), decimals as u32)
        .with_context(|| format!("Amount {} does not fit {} decimals", amount, decimals))?;
    Ok(units.into())
}

/// Read token metadata and scale the configured amount.
pub async fn resolve_token<M>(config: &TokenConfig, client: Arc<M>) -> Result<TokenTarget>
where
    M: Middleware + 'static,
{
    let address = Address::from_str(config.address.trim())
        .with_context(|| format!("Invalid token address '{}'", config.address))?;
    let contract = AirdropToken::new(address, client);
    let retry = RetryConfig::new(3, 1000);

    let name = with_retry(retry, "name()", || async {
        Ok(contract.name().call().await?)
    })
    .await?;
    let symbol = with_retry(retry, "symbol()", || async {
        Ok(contract.symbol().call().await?)
    })
    .await?;
    let decimals = with_retry(retry, "decimals()", || async {
        Ok(contract.decimals().call().await?)
    })
    .await?;
    let total_supply = with_retry(retry, "totalSupply()", || async {
        Ok(contract.total_supply().call().await?)
    })
    .await?;

    if !config.symbol.is_empty() && !config.symbol.eq_ignore_ascii_case(&symbol) {
        warn!(
            "Token {:?}: configured symbol {} differs from on-chain {}",
            address, config.symbol, symbol
        );
    }

    let target = TokenTarget {
        address,
        name,
        symbol,
        decimals,
        total_supply,
        amount: to_base_units(config.amount, decimals)?,
    };

    info!(
        "Contract {}: Name={}, Decimals={}, Total Supply={} {}, Amount per address={} {}",
        target.symbol,
        target.name,
        target.decimals,
        target.format_units(target.total_supply),
        target.symbol,
        config.amount,
        target.symbol
    );

    Ok(target)
}

/// Resolve all configured tokens, in order. Any failure is fatal.
pub async fn resolve_tokens<M>(configs: &[TokenConfig], client: Arc<M>) -> Result<Vec<TokenTarget>>
where
    M: Middleware + 'static,
{
    let mut targets = Vec::with_capacity(configs.len());
    for config in configs {
        let target = resolve_token(config, Arc::clone(&client))
            .await
            .with_context(|| format!("Error loading contract {}", config.address))?;
        targets.push(target);
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(symbol: &str) -> TokenTarget {
        TokenTarget {
            address: Address::repeat_byte(0x11),
            name: format!("{} Token", symbol),
            symbol: symbol.to_string(),
            decimals: 18,
            total_supply: U256::exp10(24),
            amount: U256::exp10(18),
        }
    }

    #[test]
    fn test_calldata_uses_airdrop_selector() {
        let recipients = vec![Address::repeat_byte(0xaa), Address::repeat_byte(0xbb)];
        let data = airdrop_calldata(&recipients, U256::from(5));
        let selector = ethers::utils::id("AirdropBatch(address[],uint256)");
        assert_eq!(&data[..4], &selector[..]);
        // selector + offset + amount + length + two addresses
        assert_eq!(data.len(), 4 + 32 * 5);
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(
            to_base_units(1.1, 18).unwrap(),
            U256::from(1_100_000_000_000_000_000u128)
        );
        assert_eq!(to_base_units(2.5, 6).unwrap(), U256::from(2_500_000u64));
    }

    #[test]
    fn test_rebind_points_every_handle_at_new_client() {
        let old = Arc::new(1u8);
        let new = Arc::new(2u8);
        let targets = vec![target("WETH"), target("WBTC")];

        let ctx = rebind(&targets, &old);
        assert!(ctx.is_bound_to(&old));

        let rebound = rebind(&ctx.targets(), &new);
        assert!(rebound.is_bound_to(&new));
        assert!(!rebound.is_bound_to(&old));
        assert_eq!(rebound.targets(), targets);
        // the previous context is untouched
        assert!(ctx.is_bound_to(&old));
    }

    #[test]
    fn test_format_units() {
        let t = target("WETH");
        assert_eq!(t.format_units(U256::exp10(18)), "1.000000000000000000");
    }
}
