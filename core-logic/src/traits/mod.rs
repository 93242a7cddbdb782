use crate::error::EndpointError;
use async_trait::async_trait;

/// Opens connections to RPC endpoints.
///
/// Chains implement this for their provider type; the endpoint pool only
/// ever sees the opaque `Conn`.
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Send + Sync;

    /// Establish a connection, failing with `UnreachableEndpoint`.
    async fn connect(&self, url: &str) -> Result<Self::Conn, EndpointError>;

    /// Cheap liveness check on an existing connection.
    async fn is_reachable(&self, conn: &Self::Conn) -> bool;
}

/// Events emitted by a distribution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyEvent {
    BatchConfirmed {
        symbol: String,
        batch: usize,
        recipients: usize,
        tx_hash: String,
    },
    RunCompleted {
        batches: usize,
        addresses: usize,
    },
    RunFailed {
        reason: String,
    },
}

impl NotifyEvent {
    pub fn message(&self) -> String {
        match self {
            NotifyEvent::BatchConfirmed {
                symbol,
                batch,
                recipients,
                tx_hash,
            } => format!(
                "Batch {} {} confirmed ({} recipients): {}",
                batch, symbol, recipients, tx_hash
            ),
            NotifyEvent::RunCompleted { batches, addresses } => format!(
                "Airdrop complete: {} batches, {} addresses paid",
                batches, addresses
            ),
            NotifyEvent::RunFailed { reason } => format!("Airdrop halted: {}", reason),
        }
    }
}

/// Outbound notification sink. `notify` must never block the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotifyEvent);

    /// Wait for in-flight deliveries before shutdown.
    async fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_message_contains_hash() {
        let event = NotifyEvent::BatchConfirmed {
            symbol: "WBTC".to_string(),
            batch: 4,
            recipients: 100,
            tx_hash: "0xabc".to_string(),
        };
        let msg = event.message();
        assert!(msg.contains("WBTC"));
        assert!(msg.contains("0xabc"));
        assert!(msg.starts_with("Batch 4"));
    }
}
