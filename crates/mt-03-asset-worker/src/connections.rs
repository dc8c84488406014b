//! # Connection Pool
//!
//! One data-source connection per endpoint, opened lazily. Each connection
//! performs the headers-subscribe handshake exactly once, right after it is
//! opened. Scripthash traffic is routed through the affinity balancer so an
//! address always talks to the same server.

use crate::domain::WorkerError;
use crate::ports::{BlockchainDataSource, DataSourceConnector};
use mt_05_affinity_balancer::EndpointBalancer;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct ConnectionPool {
    connector: Arc<dyn DataSourceConnector>,
    balancer: Arc<dyn EndpointBalancer>,
    endpoints: Vec<String>,
    // held across connect so concurrent callers share one handshake
    open: Mutex<HashMap<String, Arc<dyn BlockchainDataSource>>>,
    attempts: u32,
    retry_delay: Duration,
}

impl ConnectionPool {
    pub fn new(
        connector: Arc<dyn DataSourceConnector>,
        balancer: Arc<dyn EndpointBalancer>,
        endpoints: Vec<String>,
        attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            connector,
            balancer,
            endpoints,
            open: Mutex::new(HashMap::new()),
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    /// Connection serving `scripthash`.
    pub async fn for_scripthash(&self, scripthash: &str) -> Result<Arc<dyn BlockchainDataSource>, WorkerError> {
        let endpoint = self.balancer.assign(scripthash)?;
        self.connection(&endpoint).await
    }

    /// First endpoint, in configuration order, that accepts a connection.
    /// Used for traffic not tied to an address (transaction lookups, broadcasts).
    pub async fn any(&self) -> Result<Arc<dyn BlockchainDataSource>, WorkerError> {
        let mut last_error = None;
        for endpoint in &self.endpoints {
            match self.connection(endpoint).await {
                Ok(connection) => return Ok(connection),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| WorkerError::InvalidConfig("no data-source endpoints configured".to_string())))
    }

    pub async fn connection(&self, endpoint: &str) -> Result<Arc<dyn BlockchainDataSource>, WorkerError> {
        let mut open = self.open.lock().await;
        if let Some(connection) = open.get(endpoint) {
            return Ok(connection.clone());
        }

        let connection = self.connect_with_retry(endpoint).await?;
        open.insert(endpoint.to_string(), connection.clone());
        Ok(connection)
    }

    /// Forget the connection to `endpoint`; the next call reconnects.
    pub async fn drop_connection(&self, endpoint: &str) {
        if self.open.lock().await.remove(endpoint).is_some() {
            info!(endpoint, "Dropped data-source connection");
        }
    }

    /// Release the balancer binding of `scripthash`.
    pub fn release(&self, scripthash: &str) -> Option<String> {
        self.balancer.unassign(scripthash)
    }

    pub async fn open_connections(&self) -> usize {
        self.open.lock().await.len()
    }

    async fn connect_with_retry(&self, endpoint: &str) -> Result<Arc<dyn BlockchainDataSource>, WorkerError> {
        let mut last_error = String::new();
        for attempt in 1..=self.attempts {
            match self.handshake(endpoint).await {
                Ok(connection) => return Ok(connection),
                Err(e) => {
                    warn!(endpoint, attempt, error = %e, "Data-source connection failed");
                    last_error = e.to_string();
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(WorkerError::ConnectFailed {
            endpoint: endpoint.to_string(),
            attempts: self.attempts,
            reason: last_error,
        })
    }

    async fn handshake(&self, endpoint: &str) -> Result<Arc<dyn BlockchainDataSource>, WorkerError> {
        let connection = self.connector.connect(endpoint).await?;
        let tip = connection.headers_subscribe().await?;
        debug!(endpoint, height = tip.height, "Connected to data source");
        Ok(connection)
    }
}
