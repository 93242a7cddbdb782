#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use core_logic::{Connector, EndpointError, EndpointPool, Notifier, NotifyEvent, TransferSettings};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::utils::rlp::Rlp;
use evm_airdrop::{LedgerClient, TokenTarget};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ALWAYS: usize = usize::MAX;

pub const A: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const B: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
pub const C: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
pub const D: &str = "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb";
pub const ZERO: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub conn: usize,
    pub to: Option<Address>,
    pub nonce: U256,
    pub gas: U256,
    pub gas_price: U256,
    pub chain_id: Option<u64>,
}

/// Scripted chain shared by every connection the mock connector opens.
#[derive(Default)]
pub struct LedgerState {
    pub fail_estimates: AtomicUsize,
    pub revert_next: AtomicUsize,
    pub revert_token: Mutex<Option<Address>>,
    pub withhold_receipts: AtomicBool,
    pub balance: Mutex<U256>,
    pub estimates: AtomicUsize,
    pub balance_reads: AtomicUsize,
    pub connects: AtomicUsize,
    pub submissions: Mutex<Vec<Submission>>,
    down: Mutex<HashSet<String>>,
    receipts: Mutex<HashMap<TxHash, u64>>,
}

impl LedgerState {
    pub fn take_down(&self, url: &str) {
        self.down.lock().unwrap().insert(url.to_string());
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    fn is_down(&self, url: &str) -> bool {
        self.down.lock().unwrap().contains(url)
    }
}

/// Consume one scripted failure; `ALWAYS` never runs out.
fn take_one(counter: &AtomicUsize) -> bool {
    let current = counter.load(Ordering::SeqCst);
    if current == 0 {
        return false;
    }
    if current != ALWAYS {
        counter.store(current - 1, Ordering::SeqCst);
    }
    true
}

pub struct MockLedger {
    pub id: usize,
    pub url: String,
    state: Arc<LedgerState>,
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn estimate(&self, _tx: &TypedTransaction) -> Result<U256> {
        self.state.estimates.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.state.fail_estimates) {
            return Err(anyhow!("execution reverted"));
        }
        Ok(U256::from(100_000))
    }

    async fn next_nonce(&self, _account: Address) -> Result<U256> {
        Ok(U256::from(self.state.submissions.lock().unwrap().len()))
    }

    async fn network_gas_price(&self) -> Result<U256> {
        Ok(U256::from(1_000_000_000u64))
    }

    async fn submit_raw(&self, raw: Bytes) -> Result<TxHash> {
        let (tx, _signature) = TypedTransaction::decode_signed(&Rlp::new(raw.as_ref()))
            .map_err(|e| anyhow!("undecodable transaction: {}", e))?;
        let submission = Submission {
            conn: self.id,
            to: tx.to_addr().copied(),
            nonce: tx.nonce().copied().unwrap_or_default(),
            gas: tx.gas().copied().unwrap_or_default(),
            gas_price: tx.gas_price().unwrap_or_default(),
            chain_id: tx.chain_id().map(|id| id.as_u64()),
        };

        let to = submission.to;
        let mut submissions = self.state.submissions.lock().unwrap();
        let hash = TxHash::from_low_u64_be(submissions.len() as u64 + 1);

        let reverted = take_one(&self.state.revert_next)
            || (to.is_some() && *self.state.revert_token.lock().unwrap() == to);
        self.state
            .receipts
            .lock()
            .unwrap()
            .insert(hash, if reverted { 0 } else { 1 });
        submissions.push(submission);
        Ok(hash)
    }

    async fn fetch_receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>> {
        if self.state.withhold_receipts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let status = self.state.receipts.lock().unwrap().get(&tx_hash).copied();
        Ok(status.map(|s| TransactionReceipt {
            transaction_hash: tx_hash,
            status: Some(U64::from(s)),
            block_number: Some(U64::from(1_000)),
            gas_used: Some(U256::from(90_000)),
            ..Default::default()
        }))
    }

    async fn token_balance(&self, _token: Address, _holder: Address) -> Result<U256> {
        self.state.balance_reads.fetch_add(1, Ordering::SeqCst);
        Ok(*self.state.balance.lock().unwrap())
    }
}

#[derive(Clone)]
pub struct MockConnector {
    pub state: Arc<LedgerState>,
}

#[async_trait]
impl Connector for MockConnector {
    type Conn = MockLedger;

    async fn connect(&self, url: &str) -> Result<MockLedger, EndpointError> {
        if self.state.is_down(url) {
            return Err(EndpointError::UnreachableEndpoint {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        let id = self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MockLedger {
            id,
            url: url.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    async fn is_reachable(&self, conn: &MockLedger) -> bool {
        !self.state.is_down(&conn.url)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<NotifyEvent>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: NotifyEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn urls(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("http://rpc-{}.test", i)).collect()
}

pub async fn pool(count: usize) -> (Arc<LedgerState>, EndpointPool<MockConnector>) {
    let state = Arc::new(LedgerState::default());
    *state.balance.lock().unwrap() = U256::MAX;
    let connector = MockConnector {
        state: Arc::clone(&state),
    };
    let pool = EndpointPool::bootstrap(connector, &urls(count)).await.unwrap();
    (state, pool)
}

pub fn wallet() -> LocalWallet {
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        .parse()
        .unwrap()
}

/// No cool-downs or pauses, short confirmation window.
pub fn settings(max_retries: u32) -> TransferSettings {
    TransferSettings {
        max_retries,
        retry_cooldown_secs: 0,
        confirmation_timeout_secs: 1,
        receipt_poll_interval_secs: 1,
        first_batch_pause_secs: 0,
        batch_pause_secs: 0,
    }
}

pub fn token(byte: u8, symbol: &str) -> TokenTarget {
    TokenTarget {
        address: Address::repeat_byte(byte),
        name: format!("Wrapped {}", symbol),
        symbol: symbol.to_string(),
        decimals: 18,
        total_supply: U256::exp10(27),
        amount: U256::exp10(18),
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
