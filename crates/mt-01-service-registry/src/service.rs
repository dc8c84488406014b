//! # Registry Service
//!
//! Thread-safe registry over [`ServiceRegistry`] plus the durable set. The
//! state lock is never held across a store call.

use crate::config::RegistryConfig;
use crate::domain::{AnnounceOutcome, RegistryError, ServiceRegistry};
use crate::ports::{RegistryStore, ServiceRegistryApi};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{ServiceDescriptor, TimeSource, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

pub struct RegistryService {
    state: Mutex<ServiceRegistry>,
    store: Arc<dyn RegistryStore>,
    time: Arc<dyn TimeSource>,
    config: RegistryConfig,
}

impl RegistryService {
    pub fn new(store: Arc<dyn RegistryStore>, time: Arc<dyn TimeSource>, config: RegistryConfig) -> Self {
        Self {
            state: Mutex::new(ServiceRegistry::new()),
            store,
            time,
            config,
        }
    }

    /// Reload persisted registrations. Restored workers get a full liveness
    /// threshold to heartbeat before the sweep considers them.
    pub async fn restore(&self) -> Result<usize, RegistryError> {
        let ids = self.store.members().await?;
        let restored = self.state.lock().restore(ids, self.time.now());
        info!(restored, "Restored persisted worker registrations");
        Ok(restored)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn last_seen(&self, id: &str) -> Option<Timestamp> {
        self.state.lock().last_seen(id)
    }
}

#[async_trait]
impl ServiceRegistryApi for RegistryService {
    async fn announce(&self, descriptor: ServiceDescriptor) -> Result<AnnounceOutcome, RegistryError> {
        let id = descriptor.id.clone();
        let outcome = self.state.lock().announce(descriptor, self.time.now());

        match outcome {
            AnnounceOutcome::AlreadyKnown => {
                debug!(service_id = %id, "Worker already registered");
            }
            AnnounceOutcome::Registered => {
                if let Err(e) = self.store.add(&id).await {
                    // undo so the next announcement retries the write
                    self.state.lock().evict(&id);
                    warn!(service_id = %id, error = %e, "Failed to persist worker registration");
                    return Err(e.into());
                }
                info!(service_id = %id, "Worker registered");
            }
        }
        Ok(outcome)
    }

    fn record_heartbeat(&self, id: &str, timestamp: Timestamp) {
        self.state.lock().touch(id, timestamp);
        debug!(service_id = id, timestamp, "Heartbeat");
    }

    async fn sweep(&self) -> Vec<String> {
        let now = self.time.now();
        let (evicted, pending) = {
            let mut state = self.state.lock();
            let evicted = state.evict_expired(now, self.config.threshold_ms());
            (evicted, state.pending_removals())
        };

        for id in &evicted {
            info!(service_id = %id, "Evicted silent worker");
        }

        for id in pending {
            match self.store.remove(&id).await {
                Ok(()) => self.state.lock().removal_done(&id),
                Err(e) => warn!(service_id = %id, error = %e, "Durable removal failed, retrying next sweep"),
            }
        }
        evicted
    }

    fn known_workers(&self) -> Vec<ServiceDescriptor> {
        self.state.lock().known_workers()
    }

    fn is_connected(&self, id: &str) -> bool {
        self.state.lock().is_known(id)
    }
}

/// Run [`ServiceRegistryApi::sweep`] every `interval` until `shutdown` flips.
#[instrument(skip_all, fields(interval_ms = interval.as_millis() as u64))]
pub async fn sweep_task(registry: Arc<dyn ServiceRegistryApi>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = registry.sweep().await;
                if !evicted.is_empty() {
                    debug!(evicted = evicted.len(), "Sweep evicted workers");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Sweep task stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryRegistryStore;
    use shared_types::ManualTimeSource;

    fn setup() -> (RegistryService, Arc<InMemoryRegistryStore>, Arc<ManualTimeSource>) {
        let store = Arc::new(InMemoryRegistryStore::new());
        let clock = Arc::new(ManualTimeSource::new(1_000));
        let service = RegistryService::new(store.clone(), clock.clone(), RegistryConfig::default());
        (service, store, clock)
    }

    fn evr() -> ServiceDescriptor {
        ServiceDescriptor::new("EVR", "Evrmore", "asset")
    }

    #[tokio::test]
    async fn test_announce_persists_once() {
        let (service, store, _) = setup();
        assert_eq!(service.announce(evr()).await.unwrap(), AnnounceOutcome::Registered);
        assert_eq!(service.announce(evr()).await.unwrap(), AnnounceOutcome::AlreadyKnown);
        assert!(store.contains("EVR"));
        assert_eq!(service.known_workers(), vec![evr()]);
    }

    #[tokio::test]
    async fn test_announce_fails_loudly_when_store_offline() {
        let (service, store, _) = setup();
        store.set_online(false);
        assert!(matches!(service.announce(evr()).await, Err(RegistryError::Storage(_))));
        assert!(!service.is_connected("EVR"));

        store.set_online(true);
        assert_eq!(service.announce(evr()).await.unwrap(), AnnounceOutcome::Registered);
    }

    #[tokio::test]
    async fn test_sweep_evicts_only_silent_workers() {
        let (service, store, clock) = setup();
        service.announce(evr()).await.unwrap();
        service
            .announce(ServiceDescriptor::new("RVN", "Ravencoin", "asset"))
            .await
            .unwrap();

        clock.advance(50_000);
        service.record_heartbeat("RVN", clock.now());
        clock.advance(20_000);

        assert_eq!(service.sweep().await, vec!["EVR".to_string()]);
        assert!(!service.is_connected("EVR"));
        assert!(service.is_connected("RVN"));
        assert!(!store.contains("EVR"));
        assert_eq!(service.last_seen("EVR"), None);
    }

    #[tokio::test]
    async fn test_failed_removal_retried_next_sweep() {
        let (service, store, clock) = setup();
        service.announce(evr()).await.unwrap();
        clock.advance(61_000);

        store.set_online(false);
        assert_eq!(service.sweep().await, vec!["EVR".to_string()]);
        assert!(store.contains("EVR"));

        store.set_online(true);
        assert!(service.sweep().await.is_empty());
        assert!(!store.contains("EVR"));
    }

    #[tokio::test]
    async fn test_restore_grants_grace_period() {
        let store = Arc::new(InMemoryRegistryStore::with_members(["EVR", "RVN"]));
        let clock = Arc::new(ManualTimeSource::new(5_000));
        let service = RegistryService::new(store, clock.clone(), RegistryConfig::default());

        assert_eq!(service.restore().await.unwrap(), 2);
        clock.advance(59_000);
        assert!(service.sweep().await.is_empty());
        clock.advance(2_000);
        assert_eq!(service.sweep().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_runs_and_stops() {
        let (service, _, clock) = setup();
        let service = Arc::new(service);
        service.announce(evr()).await.unwrap();
        clock.advance(61_000);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(sweep_task(service.clone(), Duration::from_secs(30), rx));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(!service.is_connected("EVR"));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
