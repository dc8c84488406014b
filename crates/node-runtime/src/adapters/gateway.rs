//! # Asset Gateway
//!
//! Master → worker façade. Queries only go out to workers the registry
//! currently lists; everything else fails fast with
//! [`GatewayError::UnknownService`] instead of waiting out a timeout.

use crate::errors::GatewayError;
use mt_01_service_registry::ServiceRegistryApi;
use mt_02_rpc_correlator::{RequestTarget, RpcClient, RpcError};
use mt_04_tx_engine::BuiltTransaction;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared_types::{BroadcastRequest, CreateTransactionRequest, ServiceDescriptor, WorkerQuery};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct AssetGateway {
    registry: Arc<dyn ServiceRegistryApi>,
    rpc: Arc<dyn RpcClient>,
}

impl AssetGateway {
    pub fn new(registry: Arc<dyn ServiceRegistryApi>, rpc: Arc<dyn RpcClient>) -> Self {
        Self { registry, rpc }
    }

    /// Workers currently connected.
    pub fn workers(&self) -> Vec<ServiceDescriptor> {
        self.registry.known_workers()
    }

    pub async fn query(
        &self,
        service_id: &str,
        query: &WorkerQuery,
        timeout: Option<Duration>,
    ) -> Result<Value, GatewayError> {
        if !self.registry.is_connected(service_id) {
            warn!(service_id, query_type = query.kind(), "Query for unknown asset service");
            return Err(GatewayError::UnknownService(service_id.to_string()));
        }
        debug!(service_id, query_type = query.kind(), "Querying asset service");
        let query = serde_json::to_value(query).map_err(|e| RpcError::Encode(e.to_string()))?;
        Ok(self.rpc.request(RequestTarget::worker(service_id), query, timeout).await?)
    }

    pub async fn call<R: DeserializeOwned>(
        &self,
        service_id: &str,
        query: &WorkerQuery,
        timeout: Option<Duration>,
    ) -> Result<R, GatewayError> {
        let data = self.query(service_id, query, timeout).await?;
        serde_json::from_value(data).map_err(|e| RpcError::Decode(e.to_string()).into())
    }

    pub async fn create_transaction(
        &self,
        service_id: &str,
        request: CreateTransactionRequest,
    ) -> Result<BuiltTransaction, GatewayError> {
        self.call(service_id, &WorkerQuery::CreateTransaction(request), None).await
    }

    /// Returns the txid.
    pub async fn broadcast_transaction(&self, service_id: &str, raw_tx: impl Into<String>) -> Result<String, GatewayError> {
        let request = BroadcastRequest { raw_tx: raw_tx.into() };
        self.call(service_id, &WorkerQuery::BroadcastTransaction(request), None).await
    }
}
