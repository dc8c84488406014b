//! Master coordinator wiring.

use crate::adapters::{AssetGateway, ClientNotifier, TransactionSource, WalletDirectory};
use crate::container::NodeConfig;
use crate::handlers::{MasterRequestHandler, MasterRequestListener};
use anyhow::{Context, Result};
use mt_01_service_registry::{sweep_task, RegistryListener, RegistryService, RegistryStore, ServiceRegistryApi};
use mt_02_rpc_correlator::{cleanup_task, BusRequestPublisher, ResponseListener, RpcCorrelator};
use shared_bus::InMemoryEventBus;
use shared_types::TimeSource;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// External collaborators of the master.
pub struct MasterPorts {
    pub store: Arc<dyn RegistryStore>,
    pub wallets: Arc<dyn WalletDirectory>,
    pub notifier: Arc<dyn ClientNotifier>,
    pub transactions: Arc<dyn TransactionSource>,
}

/// Running master components.
pub struct MasterNode {
    pub registry: Arc<RegistryService>,
    pub correlator: Arc<RpcCorrelator>,
    pub gateway: Arc<AssetGateway>,
    tasks: Vec<JoinHandle<()>>,
}

impl MasterNode {
    /// Restore persisted registrations, then start every master listener
    /// and background task. All subscriptions exist when this returns.
    pub async fn start(
        config: &NodeConfig,
        bus: Arc<InMemoryEventBus>,
        time: Arc<dyn TimeSource>,
        ports: MasterPorts,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let registry = Arc::new(RegistryService::new(ports.store, time.clone(), config.registry.clone()));
        registry
            .restore()
            .await
            .context("Failed to restore persisted worker registrations")?;
        let registry_api: Arc<dyn ServiceRegistryApi> = registry.clone();

        let correlator = Arc::new(RpcCorrelator::with_config(
            &config.correlator,
            Arc::new(BusRequestPublisher::new(bus.clone())),
            time.clone(),
        ));
        let gateway = Arc::new(AssetGateway::new(registry_api.clone(), correlator.clone()));

        let registry_listener = RegistryListener::new(registry_api.clone(), bus.as_ref());
        let response_listener = ResponseListener::for_master(correlator.pending(), bus.as_ref());
        let request_handler = Arc::new(MasterRequestHandler::new(
            ports.wallets,
            ports.notifier,
            ports.transactions,
            bus.clone(),
            time,
        ));
        let request_listener = MasterRequestListener::new(request_handler, bus.as_ref());

        let tasks = vec![
            tokio::spawn(registry_listener.run(shutdown.clone())),
            tokio::spawn(sweep_task(registry_api, config.registry.sweep_interval, shutdown.clone())),
            tokio::spawn(response_listener.run(shutdown.clone())),
            tokio::spawn(cleanup_task(
                correlator.pending(),
                config.correlator.cleanup_interval,
                shutdown.clone(),
            )),
            tokio::spawn(request_listener.run(shutdown)),
        ];

        info!(
            sweep_interval_ms = config.registry.sweep_interval.as_millis() as u64,
            request_timeout_ms = config.correlator.default_timeout.as_millis() as u64,
            "Master coordinator started"
        );

        Ok(Self {
            registry,
            correlator,
            gateway,
            tasks,
        })
    }

    /// Wait for the background tasks after shutdown was signalled.
    pub async fn join(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
