use anyhow::Result;
use config::{Config, Environment, File};
use core_logic::{
    CommitPolicy, ConfigError, GasConfig, ProgressStore, TelegramConfig, TokenConfig,
    TransferSettings,
};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct AirdropConfig {
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
    pub tokens: Vec<TokenConfig>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_progress_file")]
    pub progress_file: String,
    #[serde(default)]
    pub commit_policy: CommitPolicy,
    #[serde(default)]
    pub transfer: TransferSettings,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

fn default_batch_size() -> usize {
    100
}

fn default_progress_file() -> String {
    ProgressStore::DEFAULT_FILE.to_string()
}

impl AirdropConfig {
    /// Load `path`, overlaid with `AIRDROP__*` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("AIRDROP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("rpc_urls")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_urls.is_empty() {
            return Err(ConfigError::MissingField {
                field: "rpc_urls".to_string(),
            });
        }
        for url in &self.rpc_urls {
            if Url::parse(url).is_err() {
                return Err(ConfigError::InvalidRpcUrl { url: url.clone() });
            }
        }

        if self.tokens.is_empty() {
            return Err(ConfigError::MissingField {
                field: "tokens".to_string(),
            });
        }
        for (i, token) in self.tokens.iter().enumerate() {
            if !token.amount.is_finite() || token.amount <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("tokens[{}].amount", i),
                    reason: format!("must be positive, got {}", token.amount),
                });
            }
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.transfer.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transfer.max_retries".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.transfer.receipt_poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transfer.receipt_poll_interval_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.gas.price_multiplier == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gas.price_multiplier".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
