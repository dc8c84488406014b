//! # Query Dispatcher
//!
//! Consumes `asset-query-<id>`, runs each query through the retry envelope
//! and answers on `asset-response-<envelope.serviceId>` with this worker's
//! id as `serviceId`. Every message is handled on its own task, so a slow
//! query never holds up the ones behind it.
//!
//! A query that fails to decode is still answered (with an error) whenever
//! the envelope carries a request id; only envelopes without one are dropped.

use crate::domain::{RetryPolicy, WorkerError};
use crate::ports::AssetWorkerApi;
use serde::Serialize;
use serde_json::Value;
use shared_bus::topics::{asset_query_topic, asset_response_topic};
use shared_bus::{publish_json, BusMessage, EventPublisher, EventSubscriber, Subscription, TopicFilter};
use shared_types::{BackgroundRefreshRequest, QueryEnvelope, ResponseEnvelope, TimeSource, WorkerQuery};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, instrument, warn};

/// Immediate answer to `updateBackgroundData`; the work continues detached.
pub const REQUEST_RECEIVED: &str = "Request Received";

pub struct QueryHandler {
    worker: Arc<dyn AssetWorkerApi>,
    publisher: Arc<dyn EventPublisher>,
    retry: RetryPolicy,
    time: Arc<dyn TimeSource>,
}

fn to_data<T: Serialize>(value: T) -> Result<Value, WorkerError> {
    serde_json::to_value(value).map_err(|e| WorkerError::Encode(e.to_string()))
}

impl QueryHandler {
    pub fn new(
        worker: Arc<dyn AssetWorkerApi>,
        publisher: Arc<dyn EventPublisher>,
        retry: RetryPolicy,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            worker,
            publisher,
            retry,
            time,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.worker.descriptor().id
    }

    /// Decode, execute and answer one query message.
    pub async fn handle(self: Arc<Self>, message: BusMessage) {
        let envelope: QueryEnvelope = match message.decode() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(topic = %message.topic, error = %e, "Dropping malformed query envelope");
                return;
            }
        };

        let outcome = match serde_json::from_value::<WorkerQuery>(envelope.query.clone()) {
            Ok(query) => self.execute(query).await,
            Err(e) => Err(WorkerError::InvalidRequest(format!(
                "unsupported query {}: {e}",
                envelope.query_type().unwrap_or("<untyped>")
            ))),
        };
        self.respond(&envelope, outcome).await;
    }

    async fn execute(self: &Arc<Self>, query: WorkerQuery) -> Result<Value, WorkerError> {
        let kind = query.kind();
        debug!(query_type = kind, "Executing query");
        self.retry.run(kind, || self.execute_once(query.clone())).await
    }

    /// `updateBackgroundData` only detaches the refresh here, which cannot fail,
    /// so the retry envelope never repeats it.
    async fn execute_once(self: &Arc<Self>, query: WorkerQuery) -> Result<Value, WorkerError> {
        match query {
            WorkerQuery::GetDerivations(filter) => to_data(self.worker.get_derivations(filter).await?),
            WorkerQuery::SaveDerivedChildren(children) => to_data(self.worker.save_derived_children(children).await?),
            WorkerQuery::GetTransactionHistory(request) => to_data(self.worker.transaction_history(request).await?),
            WorkerQuery::GetAllUtxos(request) => to_data(self.worker.all_utxos(request).await?),
            WorkerQuery::CreateTransaction(request) => to_data(self.worker.create_transaction(request).await?),
            WorkerQuery::BroadcastTransaction(request) => to_data(self.worker.broadcast_transaction(request).await?),
            WorkerQuery::UpdateBackgroundData(request) => {
                let handler = Arc::clone(self);
                tokio::spawn(async move { handler.refresh_in_background(request).await });
                to_data(REQUEST_RECEIVED)
            }
        }
    }

    async fn refresh_in_background(&self, request: BackgroundRefreshRequest) {
        let result = self
            .retry
            .run("updateBackgroundData", || self.worker.update_background_data(request.clone()))
            .await;
        if let Err(e) = result {
            error!(client_id = %request.client_id, error = %e, "Background refresh failed");
        }
    }

    async fn respond(&self, envelope: &QueryEnvelope, outcome: Result<Value, WorkerError>) {
        let timestamp = self.time.now();
        let response = match outcome {
            Ok(data) => ResponseEnvelope::success(envelope.request_id, self.service_id(), timestamp, data),
            Err(e) => {
                warn!(
                    request_id = %envelope.request_id,
                    query_type = envelope.query_type().unwrap_or("<untyped>"),
                    error = %e,
                    "Query failed"
                );
                ResponseEnvelope::failure(envelope.request_id, self.service_id(), timestamp, e.to_string())
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

/// Subscription loop on this worker's query topic.
pub struct QueryDispatcher {
    handler: Arc<QueryHandler>,
    subscription: Subscription,
}

impl QueryDispatcher {
    /// Subscribes immediately, so nothing published after this returns is missed.
    pub fn new(handler: Arc<QueryHandler>, bus: &dyn EventSubscriber) -> Self {
        let subscription = bus.subscribe(TopicFilter::exact(asset_query_topic(handler.service_id())));
        Self { handler, subscription }
    }

    #[instrument(skip_all, name = "query_dispatcher")]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                message = self.subscription.recv() => match message {
                    Some(message) => {
                        tokio::spawn(Arc::clone(&self.handler).handle(message));
                    }
                    None => {
                        warn!("Bus closed, query dispatcher stopping");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Query dispatcher stopping");
                        break;
                    }
                }
            }
        }
    }
}
