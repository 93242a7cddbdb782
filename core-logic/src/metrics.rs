use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_secs: u64,
    pub transfers: TransferMetrics,
    pub confirmation: ConfirmationMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferMetrics {
    pub succeeded: u64,
    pub failed: u64,
    pub attempts: u64,
    pub retries: u64,
    pub addresses_paid: u64,
    pub gas_used: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationMetrics {
    pub confirmed: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

/// Counters for one distribution run.
#[derive(Debug)]
pub struct MetricsCollector {
    transfers_succeeded: AtomicU64,
    transfers_failed: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    addresses_paid: AtomicU64,
    gas_used: AtomicU64,
    confirm_count: AtomicU64,
    confirm_latency_sum_ms: AtomicU64,
    confirm_min_latency_ms: AtomicU64,
    confirm_max_latency_ms: AtomicU64,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            transfers_succeeded: AtomicU64::new(0),
            transfers_failed: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            addresses_paid: AtomicU64::new(0),
            gas_used: AtomicU64::new(0),
            confirm_count: AtomicU64::new(0),
            confirm_latency_sum_ms: AtomicU64::new(0),
            confirm_min_latency_ms: AtomicU64::new(u64::MAX),
            confirm_max_latency_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self, retry: bool) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if retry {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_transfer(&self, success: bool, gas_used: u64) {
        if success {
            self.transfers_succeeded.fetch_add(1, Ordering::SeqCst);
            self.gas_used.fetch_add(gas_used, Ordering::SeqCst);
        } else {
            self.transfers_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_confirmation(&self, latency: Duration) {
        let latency_ms = latency.as_millis() as u64;
        self.confirm_count.fetch_add(1, Ordering::SeqCst);
        self.confirm_latency_sum_ms
            .fetch_add(latency_ms, Ordering::SeqCst);
        self.confirm_min_latency_ms
            .fetch_min(latency_ms, Ordering::SeqCst);
        self.confirm_max_latency_ms
            .fetch_max(latency_ms, Ordering::SeqCst);
    }

    pub fn record_paid(&self, count: usize) {
        self.addresses_paid
            .fetch_add(count as u64, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let confirmed = self.confirm_count.load(Ordering::SeqCst);
        let latency_sum = self.confirm_latency_sum_ms.load(Ordering::SeqCst);
        let min_latency = self.confirm_min_latency_ms.load(Ordering::SeqCst);

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            uptime_secs: self.uptime().as_secs(),
            transfers: TransferMetrics {
                succeeded: self.transfers_succeeded(),
                failed: self.transfers_failed(),
                attempts: self.attempts.load(Ordering::SeqCst),
                retries: self.retries(),
                addresses_paid: self.addresses_paid.load(Ordering::SeqCst),
                gas_used: self.gas_used.load(Ordering::SeqCst),
            },
            confirmation: ConfirmationMetrics {
                confirmed,
                avg_latency_ms: if confirmed > 0 {
                    latency_sum as f64 / confirmed as f64
                } else {
                    0.0
                },
                min_latency_ms: if min_latency == u64::MAX {
                    0
                } else {
                    min_latency
                },
                max_latency_ms: self.confirm_max_latency_ms.load(Ordering::SeqCst),
            },
        }
    }

    pub fn to_json(&self) -> String {
        let snapshot = self.snapshot();
        serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".to_string())
    }

    pub async fn export_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = self.to_json();
        tokio::fs::write(path, json).await
    }

    pub fn transfers_succeeded(&self) -> u64 {
        self.transfers_succeeded.load(Ordering::SeqCst)
    }

    pub fn transfers_failed(&self) -> u64 {
        self.transfers_failed.load(Ordering::SeqCst)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
