pub mod key_deriver;
pub mod master_link;
pub mod memory_chain;
pub mod memory_index;

pub use key_deriver::Bip32KeyDeriver;
pub use master_link::BusMasterLink;
pub use memory_chain::{ChainConnection, InMemoryChain};
pub use memory_index::InMemoryWalletIndex;
