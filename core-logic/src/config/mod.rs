use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One token to distribute, as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub address: String,
    /// Per-recipient amount in whole tokens (scaled by on-chain decimals).
    pub amount: f64,
    /// Label used in logs until the on-chain symbol is resolved.
    #[serde(default)]
    pub symbol: String,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("enabled", &self.enabled)
            .field("chat_id", &self.chat_id)
            .field("bot_token", &"***REDACTED***")
            .finish()
    }
}

/// When addresses are written to the progress file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Mark a batch paid once every configured token has been confirmed.
    #[default]
    PerBatch,
    /// Mark a batch paid after each token's confirmation.
    PerToken,
}

/// Retry, confirmation and pacing knobs for the transfer loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_cooldown_secs")]
    pub retry_cooldown_secs: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_receipt_poll_interval_secs")]
    pub receipt_poll_interval_secs: u64,
    #[serde(default = "default_first_batch_pause_secs")]
    pub first_batch_pause_secs: u64,
    #[serde(default = "default_batch_pause_secs")]
    pub batch_pause_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_cooldown_secs() -> u64 {
    10
}

fn default_confirmation_timeout_secs() -> u64 {
    600
}

fn default_receipt_poll_interval_secs() -> u64 {
    5
}

fn default_first_batch_pause_secs() -> u64 {
    100
}

fn default_batch_pause_secs() -> u64 {
    150
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_cooldown_secs: default_retry_cooldown_secs(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            receipt_poll_interval_secs: default_receipt_poll_interval_secs(),
            first_batch_pause_secs: default_first_batch_pause_secs(),
            batch_pause_secs: default_batch_pause_secs(),
        }
    }
}

impl TransferSettings {
    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_secs(self.retry_cooldown_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_secs(self.receipt_poll_interval_secs)
    }

    /// Pause after a token transfer; `first_batch` is true during the run's first batch.
    pub fn pause_after(&self, first_batch: bool) -> Duration {
        if first_batch {
            Duration::from_secs(self.first_batch_pause_secs)
        } else {
            Duration::from_secs(self.batch_pause_secs)
        }
    }
}
