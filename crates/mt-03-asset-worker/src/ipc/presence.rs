//! Worker presence: the start-up announcement and the periodic heartbeat.

use shared_bus::topics::{ASSET_HEARTBEATS, ASSET_SERVICE_REGISTRY};
use shared_bus::{publish_json, BusError, EventPublisher};
use shared_types::{Heartbeat, ServiceAnnouncement, ServiceDescriptor, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// Publish `{id, name, type, timestamp}` on the registry topic.
pub async fn announce(
    bus: &dyn EventPublisher,
    descriptor: &ServiceDescriptor,
    time: &dyn TimeSource,
) -> Result<usize, BusError> {
    let announcement = ServiceAnnouncement::new(descriptor, time.now());
    let delivered = publish_json(bus, ASSET_SERVICE_REGISTRY, &announcement).await?;
    if delivered == 0 {
        warn!(service_id = %descriptor.id, "Announcement published with no subscribers");
    } else {
        info!(service_id = %descriptor.id, name = %descriptor.name, "Announced worker");
    }
    Ok(delivered)
}

/// Publish `{assetId, timestamp}` every `interval` until shutdown.
#[instrument(skip_all, name = "heartbeat", fields(asset_id = %asset_id))]
pub async fn heartbeat_task(
    bus: Arc<dyn EventPublisher>,
    asset_id: String,
    time: Arc<dyn TimeSource>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let heartbeat = Heartbeat {
                    asset_id: asset_id.clone(),
                    timestamp: time.now(),
                };
                if let Err(e) = publish_json(bus.as_ref(), ASSET_HEARTBEATS, &heartbeat).await {
                    warn!(error = %e, "Failed to publish heartbeat");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Heartbeat task stopping");
                    break;
                }
            }
        }
    }
}
