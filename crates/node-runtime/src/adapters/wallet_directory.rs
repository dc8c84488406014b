//! In-memory wallet directory.

use super::ports::WalletDirectory;
use crate::errors::MasterError;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{WalletId, WalletRecord};
use std::collections::BTreeMap;

#[derive(Default)]
pub struct InMemoryWalletDirectory {
    wallets: RwLock<BTreeMap<WalletId, WalletRecord>>,
}

impl InMemoryWalletDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wallets<I>(wallets: I) -> Self
    where
        I: IntoIterator<Item = WalletRecord>,
    {
        let directory = Self::new();
        for wallet in wallets {
            directory.insert(wallet);
        }
        directory
    }

    pub fn insert(&self, wallet: WalletRecord) {
        self.wallets.write().insert(wallet.id, wallet);
    }

    pub fn len(&self) -> usize {
        self.wallets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.read().is_empty()
    }
}

#[async_trait]
impl WalletDirectory for InMemoryWalletDirectory {
    async fn wallet(&self, id: WalletId) -> Result<Option<WalletRecord>, MasterError> {
        Ok(self.wallets.read().get(&id).cloned())
    }

    async fn wallets(&self, ids: &[WalletId]) -> Result<Vec<WalletRecord>, MasterError> {
        let wallets = self.wallets.read();
        Ok(ids.iter().filter_map(|id| wallets.get(id).cloned()).collect())
    }
}
