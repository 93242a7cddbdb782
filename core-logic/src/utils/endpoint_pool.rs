//! # Core Logic - Endpoint Pool
//!
//! Ordered RPC endpoints with one active connection and rotate-on-failure.
//! The pool never retires an endpoint: a failed one is simply tried again on
//! the next wrap. Bounding retries is the caller's job.

use crate::error::EndpointError;
use crate::traits::Connector;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStatus {
    Unknown,
    Reachable,
    Unreachable,
}

/// RPC endpoint information
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    status: EndpointStatus,
    failure_count: u64,
}

impl Endpoint {
    pub fn new(url: String) -> Self {
        Self {
            url,
            status: EndpointStatus::Unknown,
            failure_count: 0,
        }
    }

    pub fn status(&self) -> EndpointStatus {
        self.status
    }

    pub fn failures(&self) -> u64 {
        self.failure_count
    }

    fn record_success(&mut self) {
        self.status = EndpointStatus::Reachable;
        self.failure_count = 0;
    }

    fn record_failure(&mut self) {
        self.status = EndpointStatus::Unreachable;
        self.failure_count += 1;
    }
}

/// Health status of an RPC endpoint
#[derive(Debug, Clone)]
pub struct RpcHealthStatus {
    pub url: String,
    pub active: bool,
    pub status: EndpointStatus,
    pub failure_count: u64,
}

pub struct EndpointPool<C: Connector> {
    connector: C,
    endpoints: Vec<Endpoint>,
    active: usize,
    conn: Arc<C::Conn>,
    /// Endpoint index `conn` was opened against; `None` once a reconnect failed.
    conn_index: Option<usize>,
}

impl<C: Connector> EndpointPool<C> {
    /// Connect to the first reachable endpoint, in configured order.
    pub async fn bootstrap(connector: C, urls: &[String]) -> Result<Self, EndpointError> {
        if urls.is_empty() {
            return Err(EndpointError::NoEndpoints);
        }

        let mut endpoints: Vec<Endpoint> = urls.iter().cloned().map(Endpoint::new).collect();

        for idx in 0..endpoints.len() {
            match connector.connect(&endpoints[idx].url).await {
                Ok(conn) => {
                    endpoints[idx].record_success();
                    info!("Connected to RPC node: {}", endpoints[idx].url);
                    return Ok(Self {
                        connector,
                        endpoints,
                        active: idx,
                        conn: Arc::new(conn),
                        conn_index: Some(idx),
                    });
                }
                Err(e) => {
                    endpoints[idx].record_failure();
                    warn!("Failed to connect to RPC node: {}", e);
                }
            }
        }

        error!("Failed to connect to all {} RPC nodes", endpoints.len());
        Err(EndpointError::AllEndpointsExhausted {
            count: endpoints.len(),
        })
    }

    /// The active connection, reconnecting if it stopped answering.
    pub async fn current(&mut self) -> Result<Arc<C::Conn>, EndpointError> {
        if self.conn_index == Some(self.active) && self.connector.is_reachable(&self.conn).await {
            return Ok(Arc::clone(&self.conn));
        }

        warn!(
            "RPC {} disconnected, trying to reconnect",
            self.endpoints[self.active].url
        );
        self.reconnect().await
    }

    /// Advance exactly one endpoint (wrapping) and connect to it.
    ///
    /// On failure the index still moves; the next `current()` or `rotate()`
    /// picks up from there.
    pub async fn rotate(&mut self) -> Result<Arc<C::Conn>, EndpointError> {
        self.active = (self.active + 1) % self.endpoints.len();
        info!("Switching to RPC {}", self.endpoints[self.active].url);
        self.reconnect().await
    }

    async fn reconnect(&mut self) -> Result<Arc<C::Conn>, EndpointError> {
        let idx = self.active;
        match self.connector.connect(&self.endpoints[idx].url).await {
            Ok(conn) => {
                self.endpoints[idx].record_success();
                self.conn = Arc::new(conn);
                self.conn_index = Some(idx);
                info!("Connected to RPC node: {}", self.endpoints[idx].url);
                Ok(Arc::clone(&self.conn))
            }
            Err(e) => {
                self.endpoints[idx].record_failure();
                self.conn_index = None;
                warn!(
                    "RPC {} failed ({} consecutive): {}",
                    self.endpoints[idx].url,
                    self.endpoints[idx].failures(),
                    e
                );
                Err(e)
            }
        }
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_url(&self) -> &str {
        &self.endpoints[self.active].url
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn health_status(&self) -> Vec<RpcHealthStatus> {
        self.endpoints
            .iter()
            .enumerate()
            .map(|(idx, e)| RpcHealthStatus {
                url: e.url.clone(),
                active: idx == self.active,
                status: e.status(),
                failure_count: e.failures(),
            })
            .collect()
    }
}
