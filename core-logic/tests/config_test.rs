use core_logic::config::{CommitPolicy, TelegramConfig, TokenConfig, TransferSettings};
use core_logic::GasConfig;
use std::time::Duration;

#[test]
fn test_token_config_without_symbol() {
    let token: TokenConfig = serde_json::from_str(
        r#"{"address": "0x1265ace75c199a531b7b1cd2a9666f434325d1e8", "amount": 1.1}"#,
    )
    .unwrap();

    assert_eq!(token.amount, 1.1);
    assert!(token.symbol.is_empty());
}

#[test]
fn test_transfer_settings_partial_override() {
    let settings: TransferSettings =
        serde_json::from_str(r#"{"max_retries": 5, "batch_pause_secs": 30}"#).unwrap();

    assert_eq!(settings.max_retries, 5);
    assert_eq!(settings.pause_after(false), Duration::from_secs(30));
    // untouched fields keep their defaults
    assert_eq!(settings.pause_after(true), Duration::from_secs(100));
    assert_eq!(settings.confirmation_timeout(), Duration::from_secs(600));
    assert_eq!(settings.retry_cooldown(), Duration::from_secs(10));
}

#[test]
fn test_telegram_disabled_by_default() {
    let telegram: TelegramConfig = serde_json::from_str("{}").unwrap();
    assert!(!telegram.enabled);
    assert!(telegram.bot_token.is_empty());
}

#[test]
fn test_gas_config_partial() {
    let gas: GasConfig = serde_json::from_str(r#"{"price_multiplier": 3}"#).unwrap();
    assert_eq!(gas.price_multiplier, 3);
    assert_eq!(gas.limit_buffer_percent, 1);
}

#[test]
fn test_commit_policy_values() {
    let batch: CommitPolicy = serde_json::from_str("\"per_batch\"").unwrap();
    let token: CommitPolicy = serde_json::from_str("\"per_token\"").unwrap();
    assert_eq!(batch, CommitPolicy::PerBatch);
    assert_eq!(token, CommitPolicy::PerToken);
    assert!(serde_json::from_str::<CommitPolicy>("\"sometimes\"").is_err());
}
