//! # Wallet Flow
//!
//! One wallet from first sight to a broadcast spend, driven only through
//! the master's gateway:
//!
//! ```text
//! gateway ──updateBackgroundData──► worker ──"Request Received"──► gateway
//!                                     │
//!                                     ├──walletDetails──► master (wallet directory)
//!                                     ├── scan + refresh against the chain
//!                                     └──balance_update──► master ──► client room
//!
//! gateway ──getTransactionHistory / createTransaction / broadcastTransaction──► worker
//! ```

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{eventually, fund, receive_address, wallet, TestNode};
    use mt_03_asset_worker::{ListedUnspent, REQUEST_RECEIVED};
    use mt_04_tx_engine::codec::decode_raw;
    use mt_04_tx_engine::{sha256d, BuiltTransaction};
    use node_runtime::AssetGateway;
    use serde_json::json;
    use shared_types::{
        AssetBalance, BackgroundRefreshRequest, BalanceReport, ChainId, CreateTransactionRequest, DerivationFilter,
        DerivedWithBalance, HistoryPage, HistoryRequest, NumberOrString, UtxoListRequest, UtxoListing, WalletRecord,
        WorkerQuery,
    };
    use tokio_test::assert_ok;

    fn payment(owner: &WalletRecord, to: &str, amount: f64, change: &str) -> CreateTransactionRequest {
        CreateTransactionRequest {
            wallet_data: vec![owner.clone()],
            scripthashes: Vec::new(),
            each_output_address: vec![to.to_string()],
            each_output_asset: vec![None],
            each_output_amount: vec![amount],
            each_output_asset_memo: Vec::new(),
            each_output_asset_memo_timestamp: Vec::new(),
            change_source: change.to_string(),
            fee_rate_kb: Some(NumberOrString::Number(10_000.0)),
        }
    }

    async fn request_refresh(gateway: &AssetGateway, service_id: &str, wallet_id: u64, client_id: &str) {
        let query = WorkerQuery::UpdateBackgroundData(BackgroundRefreshRequest {
            wallet_ids: vec![wallet_id],
            client_id: client_id.to_string(),
        });
        let ack = gateway.query(service_id, &query, None).await.unwrap();
        assert_eq!(ack, json!(REQUEST_RECEIVED));
    }

    async fn history(gateway: &AssetGateway, service_id: &str, wallet_id: u64) -> HistoryPage {
        let query = WorkerQuery::GetTransactionHistory(HistoryRequest {
            wallet_ids: vec![wallet_id],
            ..Default::default()
        });
        gateway.call(service_id, &query, None).await.unwrap()
    }

    // =========================================================================
    // EVR: RAW TRANSACTION PATH
    // =========================================================================

    #[tokio::test]
    async fn test_wallet_refresh_build_and_broadcast() {
        let mut node = TestNode::new(&[ChainId::Evr, ChainId::Rvn]);
        let owner = wallet(1);
        node.runtime.wallets().insert(owner.clone());
        let chain = node.chain(ChainId::Evr);
        let first = receive_address(ChainId::Evr, &owner, 0);
        let txids = fund(&chain, &first, &[700_000, 300_000]);
        node.start().await;
        let gateway = node.runtime.gateway().unwrap();

        // first sight: the worker asks the master who wallet 1 is, scans, pushes
        request_refresh(&gateway, "EVR", 1, "socket-1").await;
        let notifier = node.runtime.notifier();
        eventually("balance pushed to the client", || !notifier.delivered().is_empty()).await;
        let delivered = notifier.delivered();
        assert_eq!(delivered[0].client_id, "socket-1");
        assert_eq!(delivered[0].event, "balance_update");
        assert_eq!(delivered[0].payload["balance"]["walletId"], 1);
        assert_eq!(delivered[0].payload["balance"]["balances"]["EVR"]["confirmed"], 1_000_000);

        let page = history(&gateway, "EVR", 1).await;
        assert_eq!(page.total, 2);
        let mut received: Vec<&str> = page.data.iter().map(|entry| entry.received.as_str()).collect();
        received.sort_unstable();
        assert_eq!(received, vec!["0.00300000", "0.00700000"]);

        // 0.005 at 10 000 sat/kB: the larger output alone covers it
        let payee = receive_address(ChainId::Evr, &owner, 5).address;
        let built = assert_ok!(
            gateway
                .create_transaction("EVR", payment(&owner, &payee, 0.005, &first.address))
                .await
        );
        let tx = decode_raw(&hex::decode(&built.tx_hex).unwrap()).unwrap();
        assert_eq!((tx.inputs.len(), tx.outputs.len()), (1, 2));
        assert_eq!(tx.inputs[0].prev_tx_hash, txids[0]);
        assert_eq!(built.vin_amounts, vec![700_000]);
        assert_eq!(built.target_fee, 1458);
        assert_eq!(built.raw_hex, None);

        let txid = assert_ok!(gateway.broadcast_transaction("EVR", built.tx_hex.clone()).await);
        let mut expected = sha256d(&hex::decode(&built.tx_hex).unwrap());
        expected.reverse();
        assert_eq!(txid, hex::encode(expected));
        assert_eq!(chain.broadcasts(), vec![built.tx_hex.clone()]);

        // the spend confirms: only the 300 000 output is left on the address
        chain.set_unspent(
            &first.scripthash,
            vec![ListedUnspent {
                tx_hash: txids[1].clone(),
                tx_pos: 0,
                value: 300_000,
                height: 120,
                asset: None,
            }],
        );
        chain.set_balance(
            &first.scripthash,
            BalanceReport::Native(AssetBalance {
                confirmed: 300_000,
                unconfirmed: 0,
            }),
        );
        chain.set_status(&first.scripthash, Some("spent"));
        request_refresh(&gateway, "EVR", 1, "socket-1").await;
        eventually("second balance push", || notifier.delivered().len() == 2).await;
        assert_eq!(notifier.delivered()[1].payload["balance"]["balances"]["EVR"]["confirmed"], 300_000);

        let rows: Vec<DerivedWithBalance> = gateway
            .call(
                "EVR",
                &WorkerQuery::GetDerivations(DerivationFilter::keys(vec![first.address.clone()])),
                None,
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let listing: UtxoListing = gateway
            .call(
                "EVR",
                &WorkerQuery::GetAllUtxos(UtxoListRequest {
                    derived_ids: vec![rows[0].derived.id],
                }),
                None,
            )
            .await
            .unwrap();
        let values: Vec<u64> = listing.utxos.iter().map(|utxo| utxo.value).collect();
        assert_eq!(values, vec![300_000]);

        node.runtime.shutdown().await;
    }

    // =========================================================================
    // RVN: PSBT PATH
    // =========================================================================

    #[tokio::test]
    async fn test_psbt_chain_builds_from_fetched_previous_transactions() {
        let mut node = TestNode::new(&[ChainId::Rvn]);
        let owner = wallet(7);
        node.runtime.wallets().insert(owner.clone());
        let chain = node.chain(ChainId::Rvn);
        let first = receive_address(ChainId::Rvn, &owner, 0);
        fund(&chain, &first, &[700_000]);
        node.start().await;
        let gateway = node.runtime.gateway().unwrap();

        request_refresh(&gateway, "RVN", 7, "socket-9").await;
        let notifier = node.runtime.notifier();
        eventually("balance pushed to the client", || !notifier.delivered().is_empty()).await;
        assert_eq!(notifier.delivered()[0].payload["balance"]["balances"]["RVN"]["confirmed"], 700_000);

        let built: BuiltTransaction = gateway
            .create_transaction("RVN", payment(&owner, &first.address, 0.001, &first.address))
            .await
            .unwrap();
        assert!(built.raw_hex.is_some());
        assert_eq!(built.vin_amounts, vec![700_000]);

        let page = history(&gateway, "RVN", 7).await;
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].received, "0.00700000");

        node.runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_wallet_unknown_to_master_is_not_scanned() {
        let mut node = TestNode::new(&[ChainId::Evr]);
        node.start().await;
        let gateway = node.runtime.gateway().unwrap();

        request_refresh(&gateway, "EVR", 42, "socket-2").await;

        let page = history(&gateway, "EVR", 42).await;
        assert_eq!(page, HistoryPage::default());
        let rows: Vec<DerivedWithBalance> = gateway
            .call("EVR", &WorkerQuery::GetDerivations(DerivationFilter::wallets(vec![42])), None)
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert!(node.runtime.notifier().delivered().is_empty());

        node.runtime.shutdown().await;
    }
}
