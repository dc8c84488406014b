//! Asset worker wiring.

use crate::container::ChainConfig;
use anyhow::{Context, Result};
use mt_02_rpc_correlator::{cleanup_task, BusRequestPublisher, PendingRequestStore, ResponseListener, RpcCorrelator};
use mt_03_asset_worker::{
    announce, heartbeat_task, AssetWorker, Bip32KeyDeriver, BusMasterLink, ConnectionPool, DataSourceConnector,
    QueryDispatcher, QueryHandler, WalletIndex,
};
use mt_05_affinity_balancer::AffinityBalancer;
use shared_bus::InMemoryEventBus;
use shared_types::TimeSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Storage and chain access of one worker.
pub struct WorkerPorts {
    pub index: Arc<dyn WalletIndex>,
    pub connector: Arc<dyn DataSourceConnector>,
}

/// Connection pool over `chain`'s endpoint pool.
pub fn connection_pool(chain: &ChainConfig, connector: Arc<dyn DataSourceConnector>) -> Result<ConnectionPool> {
    let balancer = AffinityBalancer::new(chain.balancer.clone())
        .with_context(|| format!("Invalid endpoint pool for {}", chain.chain()))?;
    Ok(ConnectionPool::new(
        connector,
        Arc::new(balancer),
        chain.balancer.endpoints.clone(),
        chain.worker.connect_attempts,
        chain.worker.connect_retry_delay,
    ))
}

/// A running asset worker.
pub struct WorkerNode {
    pub worker: Arc<AssetWorker>,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerNode {
    /// Start the worker's listeners and heartbeat, then announce it.
    pub async fn start(
        chain: &ChainConfig,
        bus: Arc<InMemoryEventBus>,
        time: Arc<dyn TimeSource>,
        ports: WorkerPorts,
        cleanup_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let config = chain.worker.clone();
        let service_id = config.service_id().to_string();
        let pool = Arc::new(connection_pool(chain, ports.connector)?);

        let correlator = Arc::new(RpcCorrelator::new(
            Arc::new(PendingRequestStore::new(config.master_timeout)),
            Arc::new(BusRequestPublisher::new(bus.clone())),
            time.clone(),
        ));
        let response_listener = ResponseListener::for_worker(correlator.pending(), bus.as_ref(), &service_id);
        let master = BusMasterLink::new(correlator.clone(), service_id.clone(), config.master_timeout);

        let worker = Arc::new(AssetWorker::new(
            config.clone(),
            ports.index,
            pool,
            Arc::new(Bip32KeyDeriver::new(config.chain)),
            Arc::new(master),
        ));
        let handler = Arc::new(QueryHandler::new(
            worker.clone(),
            bus.clone(),
            config.retry.clone(),
            time.clone(),
        ));
        let dispatcher = QueryDispatcher::new(handler, bus.as_ref());

        let tasks = vec![
            tokio::spawn(response_listener.run(shutdown.clone())),
            tokio::spawn(cleanup_task(correlator.pending(), cleanup_interval, shutdown.clone())),
            tokio::spawn(dispatcher.run(shutdown.clone())),
            tokio::spawn(heartbeat_task(
                bus.clone(),
                service_id.clone(),
                time.clone(),
                config.heartbeat_interval,
                shutdown,
            )),
        ];

        announce(bus.as_ref(), &config.descriptor, time.as_ref())
            .await
            .with_context(|| format!("Failed to announce worker {service_id}"))?;
        info!(service_id = %service_id, chain = %config.chain, "Asset worker started");

        Ok(Self { worker, tasks })
    }

    pub fn service_id(&self) -> &str {
        self.worker.config().service_id()
    }

    pub async fn join(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
