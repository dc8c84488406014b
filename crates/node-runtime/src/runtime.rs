//! # Node Runtime
//!
//! Hosts the master coordinator and every configured worker on one
//! in-memory bus.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Start the master (restore registrations, subscribe, spawn sweeps)
//! 3. Start each worker (subscribe, spawn heartbeat, announce)
//!
//! Workers start after the master so their announcements have a listener.

use crate::adapters::{AssetGateway, InMemoryWalletDirectory, LoggingClientNotifier, PooledTransactionSource};
use crate::container::NodeConfig;
use crate::wiring::{connection_pool, MasterNode, MasterPorts, WorkerNode, WorkerPorts};
use anyhow::{Context, Result};
use mantra_telemetry::log_event;
use mt_01_service_registry::InMemoryRegistryStore;
use mt_03_asset_worker::{InMemoryChain, InMemoryWalletIndex};
use shared_bus::InMemoryEventBus;
use shared_types::{ChainId, SystemTimeSource, TimeSource};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct NodeRuntime {
    config: NodeConfig,
    bus: Arc<InMemoryEventBus>,
    time: Arc<dyn TimeSource>,
    wallets: Arc<InMemoryWalletDirectory>,
    notifier: Arc<LoggingClientNotifier>,
    chains: BTreeMap<ChainId, Arc<InMemoryChain>>,
    indexes: BTreeMap<ChainId, Arc<InMemoryWalletIndex>>,
    master: Option<MasterNode>,
    workers: Vec<WorkerNode>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Self {
        Self::with_time(config, Arc::new(SystemTimeSource))
    }

    pub fn with_time(config: NodeConfig, time: Arc<dyn TimeSource>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let chains = config
            .chains()
            .into_iter()
            .map(|chain| (chain, Arc::new(InMemoryChain::new())))
            .collect();
        let indexes = config
            .chains()
            .into_iter()
            .map(|chain| (chain, Arc::new(InMemoryWalletIndex::new())))
            .collect();
        Self {
            config,
            bus: Arc::new(InMemoryEventBus::new()),
            time,
            wallets: Arc::new(InMemoryWalletDirectory::new()),
            notifier: Arc::new(LoggingClientNotifier::new()),
            chains,
            indexes,
            master: None,
            workers: Vec::new(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Start the master, then every worker.
    pub async fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  Mantra Node Starting");
        info!("===========================================");

        self.config.validate().context("Invalid node configuration")?;

        let transactions = Arc::new(PooledTransactionSource::new());
        for chain in &self.config.workers {
            let pool = connection_pool(chain, self.chain_source(chain.chain())?)?;
            transactions.register(chain.worker.service_id(), Arc::new(pool));
        }

        let ports = MasterPorts {
            store: Arc::new(InMemoryRegistryStore::new()),
            wallets: self.wallets.clone(),
            notifier: self.notifier.clone(),
            transactions,
        };
        let master = MasterNode::start(
            &self.config,
            self.bus.clone(),
            self.time.clone(),
            ports,
            self.shutdown_rx.clone(),
        )
        .await
        .context("Failed to start master coordinator")?;
        self.master = Some(master);

        for chain in self.config.workers.clone() {
            let index = self
                .indexes
                .get(&chain.chain())
                .cloned()
                .with_context(|| format!("No wallet index for {}", chain.chain()))?;
            let ports = WorkerPorts {
                index,
                connector: self.chain_source(chain.chain())?,
            };
            let worker = WorkerNode::start(
                &chain,
                self.bus.clone(),
                self.time.clone(),
                ports,
                self.config.correlator.cleanup_interval,
                self.shutdown_rx.clone(),
            )
            .await
            .with_context(|| format!("Failed to start {} worker", chain.chain()))?;
            self.workers.push(worker);
        }

        log_event!(info, "node-runtime", "Node started", workers = self.workers.len());
        Ok(())
    }

    /// Signal shutdown and wait (bounded) for every task to stop.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let drain = async {
            if let Some(master) = self.master {
                master.join().await;
            }
            for worker in self.workers {
                worker.join().await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            warn!(grace_ms = SHUTDOWN_GRACE.as_millis() as u64, "Tasks still running after shutdown grace");
        }
        info!("Shutdown complete");
    }

    /// `None` until [`NodeRuntime::start`] succeeded.
    pub fn gateway(&self) -> Option<Arc<AssetGateway>> {
        self.master.as_ref().map(|master| master.gateway.clone())
    }

    pub fn master(&self) -> Option<&MasterNode> {
        self.master.as_ref()
    }

    pub fn workers(&self) -> &[WorkerNode] {
        &self.workers
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        self.bus.clone()
    }

    pub fn wallets(&self) -> Arc<InMemoryWalletDirectory> {
        self.wallets.clone()
    }

    pub fn notifier(&self) -> Arc<LoggingClientNotifier> {
        self.notifier.clone()
    }

    /// Scripted chain state served to `chain`'s worker and to the master.
    pub fn chain(&self, chain: ChainId) -> Option<Arc<InMemoryChain>> {
        self.chains.get(&chain).cloned()
    }

    pub fn index(&self, chain: ChainId) -> Option<Arc<InMemoryWalletIndex>> {
        self.indexes.get(&chain).cloned()
    }

    fn chain_source(&self, chain: ChainId) -> Result<Arc<InMemoryChain>> {
        self.chain(chain).with_context(|| format!("No data source for {chain}"))
    }
}
