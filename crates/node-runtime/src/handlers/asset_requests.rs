//! # Asset Request Handler
//!
//! Serves what workers ask of the master on `asset-service-requests`.
//!
//! ## Query Flow
//!
//! ```text
//! asset worker (EVR)
//!       │
//!       │ publishes {requestId, serviceId: "EVR", query}
//!       ▼
//! ┌──────────────────────────┐
//! │  asset-service-requests  │
//! └──────────────────────────┘
//!       │
//!       ▼
//! ┌─────────────────────────────────────┐
//! │  MasterRequestHandler               │
//! │  - transactionDetails → data source │
//! │  - walletDetails      → directory   │
//! │  - balance_update     → notifier    │
//! └─────────────────────────────────────┘
//!       │
//!       │ publishes {requestId, serviceId: "master", data | error}
//!       ▼
//! asset-response-EVR
//! ```

use crate::adapters::{ClientNotifier, TransactionSource, WalletDirectory};
use crate::errors::MasterError;
use mantra_telemetry::log_request_event;
use serde_json::{json, Value};
use shared_bus::topics::{asset_response_topic, ASSET_SERVICE_REQUESTS};
use shared_bus::{publish_json, BusMessage, EventPublisher, EventSubscriber, Subscription, TopicFilter};
use shared_types::{MasterQuery, QueryEnvelope, ResponseEnvelope, TimeSource};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// `serviceId` the master stamps on its responses.
pub const MASTER_SERVICE_ID: &str = "master";

/// Event name clients receive balance pushes under.
pub const BALANCE_UPDATE_EVENT: &str = "balance_update";

pub struct MasterRequestHandler {
    wallets: Arc<dyn WalletDirectory>,
    notifier: Arc<dyn ClientNotifier>,
    transactions: Arc<dyn TransactionSource>,
    publisher: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
}

impl MasterRequestHandler {
    pub fn new(
        wallets: Arc<dyn WalletDirectory>,
        notifier: Arc<dyn ClientNotifier>,
        transactions: Arc<dyn TransactionSource>,
        publisher: Arc<dyn EventPublisher>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            wallets,
            notifier,
            transactions,
            publisher,
            time,
        }
    }

    pub async fn handle(self: Arc<Self>, message: BusMessage) {
        let envelope: QueryEnvelope = match message.decode() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(topic = %message.topic, error = %e, "Dropping malformed asset request");
                return;
            }
        };

        let outcome = match serde_json::from_value::<MasterQuery>(envelope.query.clone()) {
            Ok(query) => self.execute(&envelope.service_id, query).await,
            Err(e) => Err(MasterError::InvalidRequest(format!(
                "unsupported query {}: {e}",
                envelope.query_type().unwrap_or("<untyped>")
            ))),
        };
        self.respond(&envelope, outcome).await;
    }

    async fn execute(&self, service_id: &str, query: MasterQuery) -> Result<Value, MasterError> {
        debug!(service_id, query_type = query.kind(), "Serving asset request");
        match query {
            MasterQuery::TransactionDetails(request) => self.transactions.transaction(service_id, &request.tx_hash).await,
            MasterQuery::WalletDetails(request) => {
                if let Some(id) = request.id {
                    let wallet = self.wallets.wallet(id).await?;
                    to_data(wallet)
                } else if let Some(ids) = request.wallet_ids {
                    to_data(self.wallets.wallets(&ids).await?)
                } else {
                    Err(MasterError::InvalidRequest("walletDetails needs id or walletIds".to_string()))
                }
            }
            MasterQuery::BalanceUpdate(request) => {
                info!(service_id, client_id = %request.client_id, "Forwarding balance update");
                self.notifier
                    .send_to_room(&request.client_id, BALANCE_UPDATE_EVENT, json!({ "balance": request.balance }))
                    .await?;
                Ok(Value::Null)
            }
        }
    }

    async fn respond(&self, envelope: &QueryEnvelope, outcome: Result<Value, MasterError>) {
        let timestamp = self.time.now();
        let response = match outcome {
            Ok(data) => ResponseEnvelope::success(envelope.request_id, MASTER_SERVICE_ID, timestamp, data),
            Err(e) => {
                log_request_event!(
                    warn,
                    "master",
                    "Asset request failed",
                    envelope.request_id,
                    service_id = %envelope.service_id,
                    error = %e
                );
                ResponseEnvelope::failure(envelope.request_id, MASTER_SERVICE_ID, timestamp, e.to_string())
            }
        };

        let topic = asset_response_topic(&envelope.service_id);
        match publish_json(self.publisher.as_ref(), &topic, &response).await {
            Ok(0) => warn!(topic, request_id = %envelope.request_id, "Response published with no subscribers"),
            Ok(_) => debug!(topic, request_id = %envelope.request_id, "Response published"),
            Err(e) => error!(topic, request_id = %envelope.request_id, error = %e, "Failed to publish response"),
        }
    }
}

fn to_data<T: serde::Serialize>(value: T) -> Result<Value, MasterError> {
    serde_json::to_value(value).map_err(|e| MasterError::InvalidRequest(e.to_string()))
}

/// Subscription loop on `asset-service-requests`.
pub struct MasterRequestListener {
    handler: Arc<MasterRequestHandler>,
    subscription: Subscription,
}

impl MasterRequestListener {
    /// Subscribes immediately, so nothing published after this returns is missed.
    pub fn new(handler: Arc<MasterRequestHandler>, bus: &dyn EventSubscriber) -> Self {
        Self {
            handler,
            subscription: bus.subscribe(TopicFilter::exact(ASSET_SERVICE_REQUESTS)),
        }
    }

    #[instrument(skip_all, name = "master_request_listener")]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Listening for asset requests");
        loop {
            tokio::select! {
                message = self.subscription.recv() => match message {
                    Some(message) => {
                        tokio::spawn(Arc::clone(&self.handler).handle(message));
                    }
                    None => {
                        warn!("Bus closed, asset request listener stopping");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Asset request listener stopping");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryWalletDirectory, LoggingClientNotifier};
    use async_trait::async_trait;
    use shared_bus::InMemoryEventBus;
    use shared_types::{ManualTimeSource, RequestId, WalletRecord};
    use std::time::Duration;

    struct FixedTransactions;

    #[async_trait]
    impl TransactionSource for FixedTransactions {
        async fn transaction(&self, service_id: &str, tx_hash: &str) -> Result<Value, MasterError> {
            match tx_hash {
                "known" => Ok(json!({"tx_hash": tx_hash, "hex": "0100", "served_by": service_id})),
                _ => Err(MasterError::DataSource(format!("No such mempool or blockchain transaction: {tx_hash}"))),
            }
        }
    }

    struct Setup {
        bus: Arc<InMemoryEventBus>,
        notifier: Arc<LoggingClientNotifier>,
        shutdown: watch::Sender<bool>,
    }

    fn start() -> Setup {
        let bus = Arc::new(InMemoryEventBus::new());
        let notifier = Arc::new(LoggingClientNotifier::new());
        let wallets = InMemoryWalletDirectory::with_wallets((1..=3).map(|id| WalletRecord {
            id,
            public_key: format!("xpub-{id}"),
            name: Some(format!("wallet {id}")),
        }));
        let handler = Arc::new(MasterRequestHandler::new(
            Arc::new(wallets),
            notifier.clone(),
            Arc::new(FixedTransactions),
            bus.clone(),
            Arc::new(ManualTimeSource::new(42)),
        ));
        let listener = MasterRequestListener::new(handler, bus.as_ref());
        let (shutdown, rx) = watch::channel(false);
        tokio::spawn(listener.run(rx));
        Setup { bus, notifier, shutdown }
    }

    /// Publish `query` as worker `EVR` and wait for the master's answer.
    async fn ask(bus: &InMemoryEventBus, query: Value) -> ResponseEnvelope {
        let mut responses = bus.subscribe(TopicFilter::exact(asset_response_topic("EVR")));
        let request_id = RequestId::new();
        let envelope = json!({
            "requestId": request_id,
            "serviceId": "EVR",
            "query": query,
            "timestamp": 1,
        });
        publish_json(bus, ASSET_SERVICE_REQUESTS, &envelope).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let response: ResponseEnvelope = responses.recv().await.unwrap().decode().unwrap();
                if response.request_id == request_id {
                    return response;
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_wallet_details_by_ids_and_by_id() {
        let setup = start();

        let response = ask(&setup.bus, json!({"type": "walletDetails", "request": {"walletIds": [3, 1, 8]}})).await;
        assert_eq!(response.service_id, MASTER_SERVICE_ID);
        assert_eq!(response.timestamp, 42);
        let wallets: Vec<WalletRecord> = serde_json::from_value(response.into_result().unwrap()).unwrap();
        assert_eq!(wallets.iter().map(|w| w.id).collect::<Vec<_>>(), vec![3, 1]);

        let single = ask(&setup.bus, json!({"type": "walletDetails", "request": {"id": 2}})).await;
        assert_eq!(single.into_result().unwrap()["publicKey"], "xpub-2");

        let missing = ask(&setup.bus, json!({"type": "walletDetails", "request": {"id": 9}})).await;
        assert_eq!(missing.into_result().unwrap(), Value::Null);
        setup.shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_balance_update_reaches_client_room() {
        let setup = start();

        let response = ask(
            &setup.bus,
            json!({"type": "balance_update", "request": {"clientId": "socket-7", "balance": {"walletId": 1}}}),
        )
        .await;
        assert_eq!(response.into_result().unwrap(), Value::Null);

        let delivered = setup.notifier.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].client_id, "socket-7");
        assert_eq!(delivered[0].event, BALANCE_UPDATE_EVENT);
        assert_eq!(delivered[0].payload, json!({"balance": {"walletId": 1}}));
        setup.shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_transaction_details_uses_requesting_chain() {
        let setup = start();

        let found = ask(&setup.bus, json!({"type": "transactionDetails", "request": {"txHash": "known"}})).await;
        assert_eq!(found.into_result().unwrap()["served_by"], "EVR");

        let missing = ask(&setup.bus, json!({"type": "transactionDetails", "request": {"tx_hex": "gone"}})).await;
        assert_eq!(
            missing.into_result(),
            Err("No such mempool or blockchain transaction: gone".to_string())
        );
        setup.shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_invalid_queries_are_answered_with_errors() {
        let setup = start();

        let unknown = ask(&setup.bus, json!({"type": "mint", "request": {}})).await;
        assert!(unknown.into_result().unwrap_err().starts_with("invalid request: unsupported query mint"));

        let empty = ask(&setup.bus, json!({"type": "walletDetails", "request": {}})).await;
        assert_eq!(
            empty.into_result(),
            Err("invalid request: walletDetails needs id or walletIds".to_string())
        );
        setup.shutdown.send(true).unwrap();
    }
}
