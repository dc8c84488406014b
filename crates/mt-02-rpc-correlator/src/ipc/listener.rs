//! Response listener: bus → pending store.

use crate::domain::PendingRequestStore;
use shared_bus::topics::{asset_response_topic, ASSET_RESPONSE_PREFIX};
use shared_bus::{BusMessage, EventSubscriber, Subscription, TopicFilter};
use shared_types::ResponseEnvelope;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{instrument, warn};

pub struct ResponseListener {
    pending: Arc<PendingRequestStore>,
    subscription: Subscription,
}

impl ResponseListener {
    /// Master side: responses from every worker.
    pub fn for_master(pending: Arc<PendingRequestStore>, bus: &dyn EventSubscriber) -> Self {
        Self {
            pending,
            subscription: bus.subscribe(TopicFilter::prefix(ASSET_RESPONSE_PREFIX)),
        }
    }

    /// Worker side: responses addressed to `service_id`.
    pub fn for_worker(pending: Arc<PendingRequestStore>, bus: &dyn EventSubscriber, service_id: &str) -> Self {
        Self {
            pending,
            subscription: bus.subscribe(TopicFilter::exact(asset_response_topic(service_id))),
        }
    }

    #[instrument(skip_all, name = "response_listener")]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                message = self.subscription.recv() => match message {
                    Some(message) => {
                        self.handle(&message);
                    }
                    None => {
                        warn!("Bus closed, response listener stopping");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Returns whether the message completed a pending request.
    pub fn handle(&self, message: &BusMessage) -> bool {
        match message.decode::<ResponseEnvelope>() {
            Ok(response) => {
                let request_id = response.request_id;
                self.pending.complete(request_id, response.into_result())
            }
            Err(e) => {
                warn!(topic = %message.topic, error = %e, "Malformed response");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::BusRequestPublisher;
    use crate::domain::RequestTarget;
    use crate::ports::RpcClient;
    use crate::service::RpcCorrelator;
    use serde_json::json;
    use shared_bus::topics::asset_query_topic;
    use shared_bus::{publish_json, InMemoryEventBus};
    use shared_types::{QueryEnvelope, SystemTimeSource};
    use std::time::Duration;

    #[tokio::test]
    async fn test_round_trip_over_bus() {
        let bus = Arc::new(InMemoryEventBus::new());
        let correlator = RpcCorrelator::new(
            Arc::new(PendingRequestStore::new(Duration::from_secs(5))),
            Arc::new(BusRequestPublisher::new(bus.clone())),
            Arc::new(SystemTimeSource),
        );
        let listener = ResponseListener::for_master(correlator.pending(), bus.as_ref());
        let (tx, rx) = watch::channel(false);
        let listener = tokio::spawn(listener.run(rx));

        // fake worker answering every query
        let mut queries = bus.subscribe(TopicFilter::exact(asset_query_topic("EVR")));
        let worker_bus = bus.clone();
        let worker = tokio::spawn(async move {
            let message = queries.recv().await.unwrap();
            let query: QueryEnvelope = message.decode().unwrap();
            let response = ResponseEnvelope::success(query.request_id, "EVR", 1, json!("pong"));
            publish_json(worker_bus.as_ref(), &asset_response_topic("EVR"), &response)
                .await
                .unwrap();
        });

        let answer = correlator
            .request(RequestTarget::worker("EVR"), json!({"type": "ping"}), None)
            .await;
        assert_eq!(answer, Ok(json!("pong")));

        worker.await.unwrap();
        tx.send(true).unwrap();
        listener.await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_and_malformed_responses_are_ignored() {
        let bus = InMemoryEventBus::new();
        let pending = Arc::new(PendingRequestStore::new(Duration::from_secs(5)));
        let listener = ResponseListener::for_worker(pending.clone(), &bus, "RVN");

        let (_, rx) = pending.register("master", "walletDetails", None);
        let stray = BusMessage::new(
            asset_response_topic("RVN"),
            &ResponseEnvelope::failure(shared_types::RequestId::new(), "RVN", 1, "late"),
        )
        .unwrap();
        assert!(!listener.handle(&stray));
        assert!(!listener.handle(&BusMessage::from_value("asset-response-RVN", json!({"x": 1}))));
        assert_eq!(pending.pending_count(), 1);
        drop(rx);
    }
}
