//! Bus listener feeding announcements and heartbeats into the registry.

use crate::ports::ServiceRegistryApi;
use shared_bus::topics::{ASSET_HEARTBEATS, ASSET_SERVICE_REGISTRY};
use shared_bus::{BusMessage, EventSubscriber, Subscription, TopicFilter};
use shared_types::{Heartbeat, ServiceAnnouncement};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, instrument, warn};

pub struct RegistryListener {
    registry: Arc<dyn ServiceRegistryApi>,
    subscription: Subscription,
}

impl RegistryListener {
    /// Subscribes immediately, so nothing published after this returns is missed.
    pub fn new(registry: Arc<dyn ServiceRegistryApi>, bus: &dyn EventSubscriber) -> Self {
        let subscription = bus.subscribe(TopicFilter::topics([ASSET_SERVICE_REGISTRY, ASSET_HEARTBEATS]));
        Self { registry, subscription }
    }

    #[instrument(skip_all, name = "registry_listener")]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                message = self.subscription.recv() => match message {
                    Some(message) => self.handle(&message).await,
                    None => {
                        warn!("Bus closed, registry listener stopping");
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

    pub async fn handle(&self, message: &BusMessage) {
        match message.topic.as_str() {
            ASSET_SERVICE_REGISTRY => match message.decode::<ServiceAnnouncement>() {
                Ok(announcement) => {
                    if let Err(e) = self.registry.announce(announcement.descriptor()).await {
                        error!(service_id = %announcement.id, error = %e, "Announcement not recorded");
                    }
                }
                Err(e) => warn!(error = %e, "Malformed announcement"),
            },
            ASSET_HEARTBEATS => match message.decode::<Heartbeat>() {
                Ok(heartbeat) => self.registry.record_heartbeat(&heartbeat.asset_id, heartbeat.timestamp),
                Err(e) => warn!(error = %e, "Malformed heartbeat"),
            },
            other => debug!(topic = other, "Ignoring message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryRegistryStore;
    use crate::config::RegistryConfig;
    use crate::service::RegistryService;
    use shared_bus::{publish_json, InMemoryEventBus};
    use shared_types::{ManualTimeSource, ServiceDescriptor};
    use std::time::Duration;

    #[tokio::test]
    async fn test_listener_registers_and_tracks_heartbeats() {
        let bus = InMemoryEventBus::new();
        let clock = Arc::new(ManualTimeSource::new(10));
        let registry = Arc::new(RegistryService::new(
            Arc::new(InMemoryRegistryStore::new()),
            clock,
            RegistryConfig::default(),
        ));
        let listener = RegistryListener::new(registry.clone(), &bus);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(listener.run(rx));

        let descriptor = ServiceDescriptor::new("EVR", "Evrmore", "asset");
        publish_json(&bus, ASSET_SERVICE_REGISTRY, &ServiceAnnouncement::new(&descriptor, 10))
            .await
            .unwrap();
        publish_json(
            &bus,
            ASSET_HEARTBEATS,
            &Heartbeat {
                asset_id: "EVR".into(),
                timestamp: 99,
            },
        )
        .await
        .unwrap();
        publish_json(&bus, ASSET_HEARTBEATS, &[1, 2, 3]).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while registry.last_seen("EVR") != Some(99) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(registry.is_connected("EVR"));

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
