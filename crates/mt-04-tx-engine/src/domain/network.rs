//! Per-chain constants.

use shared_types::ChainId;

/// Address versions and asset tag of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainParams {
    pub chain: ChainId,
    pub p2pkh_version: u8,
    pub p2sh_version: u8,
    /// Three-byte tag opening every asset transfer payload.
    pub asset_tag: [u8; 3],
}

pub const EVR_PARAMS: ChainParams = ChainParams {
    chain: ChainId::Evr,
    p2pkh_version: 33,
    p2sh_version: 92,
    asset_tag: *b"evr",
};

pub const RVN_PARAMS: ChainParams = ChainParams {
    chain: ChainId::Rvn,
    p2pkh_version: 60,
    p2sh_version: 122,
    asset_tag: *b"rvn",
};

impl ChainParams {
    pub fn for_chain(chain: ChainId) -> &'static ChainParams {
        match chain {
            ChainId::Evr => &EVR_PARAMS,
            ChainId::Rvn => &RVN_PARAMS,
        }
    }

    pub fn native_symbol(&self) -> &'static str {
        self.chain.native_symbol()
    }

    /// Whether `asset` denotes the native coin (absent, empty or the ticker).
    pub fn is_native(&self, asset: Option<&str>) -> bool {
        self.chain.is_native(asset)
    }
}
