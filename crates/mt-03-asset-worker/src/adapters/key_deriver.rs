//! BIP32 public derivation adapter.

use crate::domain::WorkerError;
use crate::ports::KeyDeriver;
use mt_04_tx_engine::{derive_address, ChainParams};
use shared_types::{ChainId, NewDerivedAddress, WalletRecord};

/// Derives `exposure/index` children of the wallet's extended public key.
/// Single-key wallets (a raw hex public key) yield that key for every index.
pub struct Bip32KeyDeriver {
    params: &'static ChainParams,
}

impl Bip32KeyDeriver {
    pub fn new(chain: ChainId) -> Self {
        Self {
            params: ChainParams::for_chain(chain),
        }
    }
}

impl KeyDeriver for Bip32KeyDeriver {
    fn derive(&self, wallet: &WalletRecord, exposure: u32, index: u32) -> Result<NewDerivedAddress, WorkerError> {
        Ok(derive_address(self.params, wallet.id, &wallet.public_key, exposure, index)?)
    }
}
