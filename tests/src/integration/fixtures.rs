//! Shared setup for the integration flows.

use mt_03_asset_worker::{Bip32KeyDeriver, ChainTransaction, InMemoryChain, KeyDeriver, ListedUnspent};
use mt_04_tx_engine::codec::{encode_consensus, RawTransaction};
use mt_04_tx_engine::{hash160, p2pkh_script, sha256d, TxInput, TxOutput};
use node_runtime::{NodeConfig, NodeRuntime};
use shared_types::{AssetBalance, BalanceReport, ChainId, ManualTimeSource, NewDerivedAddress, WalletId, WalletRecord};
use std::sync::Arc;
use std::time::Duration;

/// BIP32 test vector 2 master public key.
pub const XPUB: &str = "xpub661MyMwAqRbcFW31YEwpkMuc5THy2PSt5bDMsktWQcFF8syAmRUapSCGu8ED9W6oDMSgv6Zz8idoc4a6mr8BDzTJY47LJhkJ8UB7WEGuduB";

pub const FUNDED_HEIGHT: u64 = 120;

pub fn wallet(id: WalletId) -> WalletRecord {
    WalletRecord {
        id,
        public_key: XPUB.to_string(),
        name: Some(format!("wallet {id}")),
    }
}

pub fn receive_address(chain: ChainId, wallet: &WalletRecord, index: u32) -> NewDerivedAddress {
    Bip32KeyDeriver::new(chain).derive(wallet, 0, index).unwrap()
}

/// A consensus-encoded transaction paying `value` to `derived` at output 0.
/// `seed` keeps txids of otherwise equal funding transactions apart.
pub fn funding_transaction(derived: &NewDerivedAddress, seed: u32, value: u64) -> ChainTransaction {
    let pubkey = hex::decode(&derived.pubkey).unwrap();
    let tx = RawTransaction::new(
        vec![TxInput::new(hex::encode([0xee; 32]), seed, Vec::new())],
        vec![TxOutput::new(value, p2pkh_script(&hash160(&pubkey)))],
    );
    let bytes = encode_consensus(&tx).unwrap();
    let mut txid = sha256d(&bytes);
    txid.reverse();
    ChainTransaction {
        tx_hash: hex::encode(txid),
        hex: hex::encode(bytes),
        height: Some(FUNDED_HEIGHT),
        block_time: Some(1_700_000_000),
    }
}

/// Put one confirmed funding transaction per value on `derived`'s scripthash
/// and mark the address active. Returns the txids.
pub fn fund(chain: &InMemoryChain, derived: &NewDerivedAddress, values: &[u64]) -> Vec<String> {
    let mut listed = Vec::new();
    for (seed, value) in values.iter().enumerate() {
        let transaction = funding_transaction(derived, seed as u32, *value);
        listed.push(ListedUnspent {
            tx_hash: transaction.tx_hash.clone(),
            tx_pos: 0,
            value: *value,
            height: FUNDED_HEIGHT,
            asset: None,
        });
        chain.add_transaction(transaction);
    }
    let txids = listed.iter().map(|entry| entry.tx_hash.clone()).collect();
    chain.set_tip(FUNDED_HEIGHT + 6);
    chain.set_unspent(&derived.scripthash, listed);
    chain.set_balance(
        &derived.scripthash,
        BalanceReport::Native(AssetBalance {
            confirmed: values.iter().sum::<u64>() as i64,
            unconfirmed: 0,
        }),
    );
    chain.set_status(&derived.scripthash, Some("funded"));
    txids
}

/// A node on a frozen clock. Registry liveness never lapses unless the
/// test advances `time`.
pub struct TestNode {
    pub runtime: NodeRuntime,
    pub time: Arc<ManualTimeSource>,
}

impl TestNode {
    pub fn new(chains: &[ChainId]) -> Self {
        let time = Arc::new(ManualTimeSource::new(1_000));
        Self {
            runtime: NodeRuntime::with_time(NodeConfig::for_testing(chains), time.clone()),
            time,
        }
    }

    pub fn chain(&self, chain: ChainId) -> Arc<InMemoryChain> {
        self.runtime.chain(chain).unwrap()
    }

    /// Start and wait until the master lists every worker.
    pub async fn start(&mut self) {
        self.runtime.start().await.unwrap();
        let gateway = self.runtime.gateway().unwrap();
        let expected = self.runtime.workers().len();
        eventually("every worker registered", || gateway.workers().len() == expected).await;
    }
}

/// Poll `condition` until it holds; panic after two seconds.
pub async fn eventually<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for: {what}");
}
