//! # Orchestrator
//!
//! Drives one distribution run: balance check, planning, then every batch
//! through every token in order with pacing between transfers. Owns the
//! endpoint pool, token handles and progress store for the run.

use crate::executor::TransferExecutor;
use crate::ledger::{LedgerClient, TokenContext};
use crate::planner::{canonical, partition, plan, Batch};
use core_logic::{
    CommitPolicy, Connector, EndpointPool, NotifyEvent, ProgressStore, TransferError,
    TransferSettings,
};
use ethers::types::{TxHash, U256};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: usize,
    pub transfers: usize,
    pub addresses_paid: usize,
    pub tx_hashes: Vec<TxHash>,
}

pub struct Orchestrator<C>
where
    C: Connector,
    C::Conn: LedgerClient,
{
    pool: EndpointPool<C>,
    tokens: TokenContext<C::Conn>,
    executor: TransferExecutor,
    progress: ProgressStore,
    settings: TransferSettings,
    batch_size: usize,
    dry_run: bool,
}

impl<C> Orchestrator<C>
where
    C: Connector,
    C::Conn: LedgerClient,
{
    pub fn new(
        pool: EndpointPool<C>,
        tokens: TokenContext<C::Conn>,
        executor: TransferExecutor,
        progress: ProgressStore,
    ) -> Self {
        Self {
            pool,
            tokens,
            executor,
            progress,
            settings: TransferSettings::default(),
            batch_size: 100,
            dry_run: false,
        }
    }

    pub fn with_settings(mut self, settings: TransferSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn pool(&self) -> &EndpointPool<C> {
        &self.pool
    }

    pub fn tokens(&self) -> &TokenContext<C::Conn> {
        &self.tokens
    }

    /// Distribute every configured token to the addresses in `raw` that
    /// have not been paid yet. Stops at the first batch that exhausts its
    /// attempt budget.
    pub async fn run(&mut self, raw: &[String]) -> Result<RunSummary, TransferError> {
        let plan = plan(raw, &self.progress);
        self.check_balances(plan.remaining.len()).await;

        let batches = partition(&plan.remaining, self.batch_size);
        if batches.is_empty() {
            info!("No new addresses to process");
            return Ok(RunSummary::default());
        }

        info!(
            "{} addresses in {} batches of up to {}, {} tokens each",
            plan.remaining.len(),
            batches.len(),
            self.batch_size,
            self.tokens.len()
        );

        if self.dry_run {
            info!("Dry run: no transactions sent");
            return Ok(RunSummary {
                batches: batches.len(),
                ..Default::default()
            });
        }

        match self.run_batches(&batches).await {
            Ok(summary) => {
                info!(
                    "Airdrop SUCCESS: {} batches, {} transfers, {} addresses paid",
                    summary.batches, summary.transfers, summary.addresses_paid
                );
                self.executor.notifier().notify(NotifyEvent::RunCompleted {
                    batches: summary.batches,
                    addresses: summary.addresses_paid,
                });
                Ok(summary)
            }
            Err(e) => {
                error!("Airdrop FAILED, halting run: {}", e);
                self.executor.notifier().notify(NotifyEvent::RunFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_batches(&mut self, batches: &[Batch]) -> Result<RunSummary, TransferError> {
        let mut summary = RunSummary::default();
        let token_count = self.tokens.len();
        let total = batches.len();

        for (pos, batch) in batches.iter().enumerate() {
            info!(
                "Processing batch {}/{} ({} addresses)",
                batch.index,
                total,
                batch.len()
            );
            let first_batch = pos == 0;
            let last_batch = pos + 1 == total;

            for token_index in 0..token_count {
                let Some(owed) = self.owed(batch, token_index) else {
                    continue;
                };
                let outcome = self
                    .executor
                    .execute(
                        &mut self.pool,
                        &mut self.tokens,
                        token_index,
                        &owed,
                        &mut self.progress,
                    )
                    .await?;
                summary.transfers += 1;
                summary.tx_hashes.push(outcome.tx_hash);

                let final_transfer = last_batch && token_index + 1 == token_count;
                if !final_transfer {
                    let pause = self.settings.pause_after(first_batch);
                    if !pause.is_zero() {
                        info!("Waiting {}s before next transfer", pause.as_secs());
                        tokio::time::sleep(pause).await;
                    }
                }
            }

            if self.executor.commit_policy() == CommitPolicy::PerBatch {
                match self.progress.mark_paid(batch.canonical()) {
                    Ok(added) => self.executor.metrics().record_paid(added),
                    Err(e) => error!("Failed to persist progress: {}", e),
                }
            }

            summary.batches += 1;
            summary.addresses_paid += batch.len();
        }

        Ok(summary)
    }

    /// The part of `batch` still owed `token_index`, or `None` when an
    /// earlier run already confirmed it for every address.
    fn owed(&self, batch: &Batch, token_index: usize) -> Option<Batch> {
        let target = &self.tokens.get(token_index)?.target;
        let token = canonical(&target.address);
        let (done, owed): (Vec<_>, Vec<_>) = batch
            .addresses
            .iter()
            .partition(|a| self.progress.is_confirmed(&token, &canonical(a)));

        if owed.is_empty() {
            info!(
                "Batch {} {} already confirmed, skipping",
                batch.index, target.symbol
            );
            return None;
        }
        if !done.is_empty() {
            info!(
                "Batch {} {} already confirmed for {} addresses",
                batch.index,
                target.symbol,
                done.len()
            );
        }
        Some(Batch {
            index: batch.index,
            addresses: owed.into_iter().copied().collect(),
        })
    }

    /// Log each token's balance held by its distribution contract against
    /// what the remaining list needs. Never stops the run.
    async fn check_balances(&mut self, recipients: usize) {
        let conn = match self.pool.current().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Skipping balance check: {}", e);
                return;
            }
        };

        for target in self.tokens.targets() {
            let required = target.amount.saturating_mul(U256::from(recipients));
            match conn.token_balance(target.address, target.address).await {
                Ok(balance) => {
                    info!(
                        "{} balance: {} {}, required: {} {}",
                        target.symbol,
                        target.format_units(balance),
                        target.symbol,
                        target.format_units(required),
                        target.symbol
                    );
                    if recipients > 0 && balance < required {
                        warn!(
                            "Insufficient {} balance: short by {}",
                            target.symbol,
                            target.format_units(required - balance)
                        );
                    }
                }
                Err(e) => warn!("Failed to read {} balance: {:#}", target.symbol, e),
            }
        }
    }
}
