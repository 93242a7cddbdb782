//! # Transfer Executor
//!
//! Moves one batch of one token on-chain: estimate, build, sign, submit,
//! confirm. Failed attempts rotate the endpoint pool, rebind the token
//! handles to the new connection and try again after a cool-down, up to a
//! fixed attempt budget.

use crate::ledger::{airdrop_calldata, rebind, LedgerClient, TokenContext, TokenTarget};
use crate::notifier::NoopNotifier;
use crate::planner::{canonical, Batch};
use crate::utils::gas::GasManager;
use core_logic::{
    CommitPolicy, Connector, EndpointPool, GasConfig, MetricsCollector, Notifier, NotifyEvent,
    ProgressStore, RetryConfig, TransferError, TransferSettings,
};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Estimating,
    Building,
    Signing,
    Submitting,
    Confirming,
    Succeeded,
    Failed,
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransferState::Estimating => "estimating",
            TransferState::Building => "building",
            TransferState::Signing => "signing",
            TransferState::Submitting => "submitting",
            TransferState::Confirming => "confirming",
            TransferState::Succeeded => "succeeded",
            TransferState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Bookkeeping for one (batch, token) call; never outlives it.
#[derive(Debug)]
struct TransferAttempt {
    batch: usize,
    symbol: String,
    number: u32,
    last_error: Option<TransferError>,
}

impl TransferAttempt {
    fn into_failure(self) -> TransferError {
        let last_error = self
            .last_error
            .unwrap_or_else(|| TransferError::SubmissionFailed("no attempt made".to_string()));
        TransferError::BatchTransferFailed {
            symbol: self.symbol,
            batch: self.batch,
            attempts: self.number,
            last_error: Box::new(last_error),
        }
    }

    fn transition(&self, state: TransferState) {
        debug!(
            "Batch {} {} attempt {}: {}",
            self.batch, self.symbol, self.number, state
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: U256,
    pub attempts: u32,
}

pub struct TransferExecutor {
    wallet: LocalWallet,
    chain_id: u64,
    gas: GasManager,
    retry: RetryConfig,
    confirmation_timeout: Duration,
    poll_interval: Duration,
    commit_policy: CommitPolicy,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<MetricsCollector>,
}

impl TransferExecutor {
    pub fn new(wallet: LocalWallet, chain_id: u64) -> Self {
        Self::with_settings(wallet, chain_id, &TransferSettings::default())
    }

    pub fn with_settings(wallet: LocalWallet, chain_id: u64, settings: &TransferSettings) -> Self {
        Self {
            wallet: wallet.with_chain_id(chain_id),
            chain_id,
            gas: GasManager::default(),
            retry: RetryConfig::fixed(settings.max_retries, settings.retry_cooldown()),
            confirmation_timeout: settings.confirmation_timeout(),
            poll_interval: settings.receipt_poll_interval(),
            commit_policy: CommitPolicy::default(),
            notifier: Arc::new(NoopNotifier),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    pub fn with_gas(mut self, gas: GasConfig) -> Self {
        self.gas = GasManager::new(gas);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.commit_policy = policy;
        self
    }

    pub fn sender(&self) -> Address {
        self.wallet.address()
    }

    pub fn commit_policy(&self) -> CommitPolicy {
        self.commit_policy
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry.max_retries.max(1)
    }

    /// Transfer `tokens[token_index]` to every address in `batch`.
    ///
    /// Returns `BatchTransferFailed` once the attempt budget is spent; no
    /// further attempt is ever made for this (batch, token) pair.
    pub async fn execute<C>(
        &self,
        pool: &mut EndpointPool<C>,
        tokens: &mut TokenContext<C::Conn>,
        token_index: usize,
        batch: &Batch,
        progress: &mut ProgressStore,
    ) -> Result<TransferOutcome, TransferError>
    where
        C: Connector,
        C::Conn: LedgerClient,
    {
        let target = tokens
            .get(token_index)
            .map(|b| b.target.clone())
            .ok_or_else(|| {
                TransferError::TransactionBuildFailed(format!("no token at index {}", token_index))
            })?;

        let max_attempts = self.max_attempts();
        let mut attempt = TransferAttempt {
            batch: batch.index,
            symbol: target.symbol.clone(),
            number: 0,
            last_error: None,
        };

        loop {
            attempt.number += 1;
            self.metrics.record_attempt(attempt.number > 1);

            let result = match pool.current().await {
                Ok(conn) => {
                    if !tokens.is_bound_to(&conn) {
                        debug!("Rebinding token handles to {}", pool.active_url());
                        *tokens = rebind(&tokens.targets(), &conn);
                    }
                    match tokens.get(token_index) {
                        Some(binding) => {
                            let client = Arc::clone(&binding.client);
                            self.attempt_once(client.as_ref(), &target, batch, &attempt)
                                .await
                        }
                        None => Err(TransferError::TransactionBuildFailed(format!(
                            "no token at index {}",
                            token_index
                        ))),
                    }
                }
                Err(e) => Err(TransferError::from(e)),
            };

            let err = match result {
                Ok(mut outcome) => {
                    outcome.attempts = attempt.number;
                    attempt.transition(TransferState::Succeeded);
                    self.on_success(&target, batch, &outcome, progress);
                    return Ok(outcome);
                }
                Err(e) => e,
            };

            attempt.transition(TransferState::Failed);

            if err.is_retryable() && attempt.number < max_attempts {
                let delay = self.retry.delay_for(attempt.number);
                warn!(
                    "Batch {} {} attempt {}/{} failed ({}): {}. Retrying in {:?}",
                    batch.index,
                    target.symbol,
                    attempt.number,
                    max_attempts,
                    err.kind(),
                    err,
                    delay
                );
                attempt.last_error = Some(err);

                match pool.rotate().await {
                    Ok(conn) => *tokens = rebind(&tokens.targets(), &conn),
                    Err(e) => warn!("Rotation to {} failed: {}", pool.active_url(), e),
                }
                tokio::time::sleep(delay).await;
                continue;
            }

            error!(
                "Batch {} {} FAILED after {} attempts: {}",
                batch.index, target.symbol, attempt.number, err
            );
            self.metrics.record_transfer(false, 0);
            attempt.last_error = Some(err);
            return Err(attempt.into_failure());
        }
    }

    async fn attempt_once<L: LedgerClient + ?Sized>(
        &self,
        client: &L,
        target: &TokenTarget,
        batch: &Batch,
        attempt: &TransferAttempt,
    ) -> Result<TransferOutcome, TransferError> {
        let sender = self.sender();
        let mut tx: TypedTransaction = TransactionRequest::new()
            .from(sender)
            .to(target.address)
            .data(airdrop_calldata(&batch.addresses, target.amount))
            .chain_id(self.chain_id)
            .into();

        attempt.transition(TransferState::Estimating);
        let estimate = client
            .estimate(&tx)
            .await
            .map_err(|e| TransferError::GasEstimationFailed(format!("{:#}", e)))?;
        let gas_limit = self.gas.buffered_limit(estimate);

        attempt.transition(TransferState::Building);
        let nonce = client
            .next_nonce(sender)
            .await
            .map_err(|e| TransferError::TransactionBuildFailed(format!("nonce: {:#}", e)))?;
        let network_price = client
            .network_gas_price()
            .await
            .map_err(|e| TransferError::TransactionBuildFailed(format!("gas price: {:#}", e)))?;
        tx.set_nonce(nonce);
        tx.set_gas(gas_limit);
        tx.set_gas_price(self.gas.bumped_price(network_price));

        attempt.transition(TransferState::Signing);
        let signature = self
            .wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| TransferError::SigningFailed(e.to_string()))?;
        let raw = tx.rlp_signed(&signature);

        attempt.transition(TransferState::Submitting);
        let tx_hash = client
            .submit_raw(raw)
            .await
            .map_err(|e| TransferError::SubmissionFailed(format!("{:#}", e)))?;
        info!(
            "Batch {} {} sent, tx hash: {:?} (nonce {}, gas limit {})",
            batch.index, target.symbol, tx_hash, nonce, gas_limit
        );

        attempt.transition(TransferState::Confirming);
        let started = Instant::now();
        let receipt = self.wait_for_receipt(client, tx_hash).await?;
        self.metrics.record_confirmation(started.elapsed());

        if receipt.status != Some(U64::from(1)) {
            return Err(TransferError::TransactionReverted {
                tx_hash: format!("{:?}", tx_hash),
            });
        }

        Ok(TransferOutcome {
            tx_hash,
            block_number: receipt.block_number.map(|b| b.as_u64()),
            gas_used: receipt.gas_used.unwrap_or_default(),
            attempts: attempt.number,
        })
    }

    /// Poll until a receipt shows up or the confirmation timeout elapses.
    async fn wait_for_receipt<L: LedgerClient + ?Sized>(
        &self,
        client: &L,
        tx_hash: TxHash,
    ) -> Result<TransactionReceipt, TransferError> {
        let poll = async {
            loop {
                match client.fetch_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => warn!("Receipt query for {:?} failed: {:#}", tx_hash, e),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        tokio::time::timeout(self.confirmation_timeout, poll)
            .await
            .map_err(|_| TransferError::ConfirmationTimeout {
                tx_hash: format!("{:?}", tx_hash),
                timeout_secs: self.confirmation_timeout.as_secs(),
            })
    }

    fn on_success(
        &self,
        target: &TokenTarget,
        batch: &Batch,
        outcome: &TransferOutcome,
        progress: &mut ProgressStore,
    ) {
        info!(
            "Batch {} {} SUCCESS: {:?} in block {} ({} gas, {} attempts)",
            batch.index,
            target.symbol,
            outcome.tx_hash,
            outcome
                .block_number
                .map(|b| b.to_string())
                .unwrap_or_else(|| "?".to_string()),
            outcome.gas_used,
            outcome.attempts
        );
        self.metrics.record_transfer(true, outcome.gas_used.low_u64());

        self.notifier.notify(NotifyEvent::BatchConfirmed {
            symbol: target.symbol.clone(),
            batch: batch.index,
            recipients: batch.len(),
            tx_hash: format!("{:?}", outcome.tx_hash),
        });

        match self.commit_policy {
            CommitPolicy::PerToken => match progress.mark_paid(batch.canonical()) {
                Ok(added) => self.metrics.record_paid(added),
                Err(e) => error!("Failed to persist progress: {}", e),
            },
            CommitPolicy::PerBatch => {
                let token = canonical(&target.address);
                if let Err(e) = progress.mark_confirmed(&token, batch.canonical()) {
                    error!("Failed to persist pending confirmations: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_labels() {
        assert_eq!(TransferState::Estimating.to_string(), "estimating");
        assert_eq!(TransferState::Confirming.to_string(), "confirming");
    }

    #[test]
    fn test_executor_defaults() {
        let wallet: LocalWallet = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
            .parse()
            .unwrap();
        let executor = TransferExecutor::new(wallet, 17000);
        assert_eq!(executor.max_attempts(), 3);
        assert_eq!(executor.commit_policy, CommitPolicy::PerBatch);
        assert_eq!(
            format!("{:?}", executor.sender()),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }
}
