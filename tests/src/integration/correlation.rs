//! # Correlation Edge Cases
//!
//! What callers see when the other side of a request is missing, slow, or
//! failing:
//!
//! 1. **Unknown worker**: the gateway refuses before anything is published
//! 2. **Silent worker**: the request times out and leaves nothing pending
//! 3. **Evicted worker**: once the sweep drops it, it is unknown again
//! 4. **Flaky storage**: transient failures are retried inside the worker
//! 5. **Worker → master**: a worker's own correlator reaches the master

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{eventually, wallet, TestNode};
    use mt_02_rpc_correlator::{BusRequestPublisher, PendingRequestStore, ResponseListener, RpcCorrelator, RpcError};
    use mt_03_asset_worker::{announce, BusMasterLink, MasterLink, WorkerError};
    use node_runtime::GatewayError;
    use shared_types::{
        ChainId, DerivationFilter, DerivedWithBalance, ManualTimeSource, ServiceDescriptor, TimeSource,
        UtxoListRequest, WorkerQuery,
    };
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::sync::watch;

    const GHOST: &str = "GHOST";

    fn derivations(wallet_id: u64) -> WorkerQuery {
        WorkerQuery::GetDerivations(DerivationFilter::wallets(vec![wallet_id]))
    }

    /// Register a worker id that nothing serves.
    async fn announce_ghost(node: &TestNode) {
        let bus = node.runtime.bus();
        let time: &dyn TimeSource = node.time.as_ref();
        announce(bus.as_ref(), &ServiceDescriptor::new(GHOST, "ghost", "asset"), time)
            .await
            .unwrap();
        let gateway = node.runtime.gateway().unwrap();
        eventually("ghost registered", || gateway.workers().iter().any(|d| d.id == GHOST)).await;
    }

    #[tokio::test]
    async fn test_unknown_worker_fails_fast() {
        let mut node = TestNode::new(&[ChainId::Evr]);
        node.start().await;
        let gateway = node.runtime.gateway().unwrap();
        let correlator = node.runtime.master().unwrap().correlator.clone();

        let started = Instant::now();
        let err = gateway.query("RVN", &derivations(1), None).await.unwrap_err();

        assert_eq!(err, GatewayError::UnknownService("RVN".to_string()));
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(correlator.pending_count(), 0);
        node.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_silent_worker_times_out() {
        let mut node = TestNode::new(&[ChainId::Evr]);
        node.start().await;
        announce_ghost(&node).await;
        let gateway = node.runtime.gateway().unwrap();

        let err = gateway
            .query(GHOST, &derivations(1), Some(Duration::from_millis(30)))
            .await
            .unwrap_err();

        match err {
            GatewayError::Rpc(RpcError::Timeout {
                service_id, timeout_ms, ..
            }) => {
                assert_eq!(service_id, GHOST);
                assert_eq!(timeout_ms, 30);
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert_eq!(node.runtime.master().unwrap().correlator.pending_count(), 0);

        // the live worker is unaffected
        let rows: Vec<DerivedWithBalance> = gateway.call("EVR", &derivations(1), None).await.unwrap();
        assert!(rows.is_empty());
        node.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_evicted_worker_is_unknown_again() {
        let mut node = TestNode::new(&[ChainId::Evr]);
        node.start().await;
        announce_ghost(&node).await;
        let gateway = node.runtime.gateway().unwrap();

        // well past the 100ms liveness threshold; the ghost never heartbeats
        node.time.advance(1_000);
        eventually("ghost evicted", || gateway.workers().iter().all(|d| d.id != GHOST)).await;

        let err = gateway.query(GHOST, &derivations(1), None).await.unwrap_err();
        assert_eq!(err, GatewayError::UnknownService(GHOST.to_string()));
        node.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_transient_storage_failures_are_retried() {
        let mut node = TestNode::new(&[ChainId::Evr]);
        node.start().await;
        let gateway = node.runtime.gateway().unwrap();
        let index = node.runtime.index(ChainId::Evr).unwrap();

        // two failures fit in the five-attempt budget
        index.fail_next(2);
        let rows: Vec<DerivedWithBalance> = gateway.call("EVR", &derivations(1), None).await.unwrap();
        assert!(rows.is_empty());

        index.fail_next(10);
        let query = WorkerQuery::GetAllUtxos(UtxoListRequest { derived_ids: vec![1] });
        let err = gateway.query("EVR", &query, None).await.unwrap_err();
        match err {
            GatewayError::Rpc(RpcError::Remote(message)) => {
                assert!(message.contains("terminating connection"), "{message}");
            }
            other => panic!("expected the worker's error, got {other:?}"),
        }
        index.fail_next(0);
        node.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_worker_side_correlator_reaches_master() {
        let mut node = TestNode::new(&[ChainId::Evr]);
        node.runtime.wallets().insert(wallet(3));
        node.start().await;
        let bus = node.runtime.bus();

        // a second worker identity with its own correlator on the same bus
        let time: Arc<dyn TimeSource> = Arc::new(ManualTimeSource::new(5_000));
        let correlator = Arc::new(RpcCorrelator::new(
            Arc::new(PendingRequestStore::new(Duration::from_millis(200))),
            Arc::new(BusRequestPublisher::new(bus.clone())),
            time,
        ));
        let listener = ResponseListener::for_worker(correlator.pending(), bus.as_ref(), "EVR-2");
        let (shutdown, rx) = watch::channel(false);
        tokio::spawn(listener.run(rx));
        let link = BusMasterLink::new(correlator.clone(), "EVR-2", Duration::from_millis(200));

        let wallets = link.wallet_details(vec![3, 4]).await.unwrap();
        assert_eq!(wallets, vec![wallet(3)]);

        link.push_balance("socket-5", serde_json::json!({"walletId": 3})).await.unwrap();
        let notifier = node.runtime.notifier();
        eventually("balance delivered", || notifier.delivered().len() == 1).await;
        assert_eq!(notifier.delivered()[0].client_id, "socket-5");
        assert_eq!(correlator.pending_count(), 0);

        // nobody answers on a bus without a master
        node.runtime.shutdown().await;
        let err = link.wallet_details(vec![3]).await.unwrap_err();
        assert!(matches!(err, WorkerError::Rpc(RpcError::Timeout { .. })), "{err:?}");
        shutdown.send(true).unwrap();
    }
}
