//! Supported chain identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chains served by an asset worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainId {
    /// Evrmore mainnet.
    #[serde(rename = "EVR")]
    Evr,
    /// Ravencoin mainnet.
    #[serde(rename = "RVN")]
    Rvn,
}

impl ChainId {
    /// All supported chains, in configuration order.
    pub const ALL: [ChainId; 2] = [ChainId::Evr, ChainId::Rvn];

    /// Ticker of the chain's native coin, also used as the asset tag of
    /// native-coin UTXOs.
    pub fn native_symbol(&self) -> &'static str {
        match self {
            ChainId::Evr => "EVR",
            ChainId::Rvn => "RVN",
        }
    }

    /// Whether `asset` names this chain's native coin. A missing asset tag is native.
    pub fn is_native(&self, asset: Option<&str>) -> bool {
        match asset {
            None => true,
            Some(name) => name.is_empty() || name.eq_ignore_ascii_case(self.native_symbol()),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.native_symbol())
    }
}

impl FromStr for ChainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EVR" => Ok(ChainId::Evr),
            "RVN" => Ok(ChainId::Rvn),
            other => Err(format!("unsupported chain: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_id() {
        assert_eq!("evr".parse::<ChainId>().unwrap(), ChainId::Evr);
        assert_eq!(" RVN ".parse::<ChainId>().unwrap(), ChainId::Rvn);
        assert!("BTC".parse::<ChainId>().is_err());
    }

    #[test]
    fn test_native_detection() {
        assert!(ChainId::Evr.is_native(None));
        assert!(ChainId::Evr.is_native(Some("evr")));
        assert!(ChainId::Evr.is_native(Some("")));
        assert!(!ChainId::Evr.is_native(Some("RVN")));
        assert!(!ChainId::Rvn.is_native(Some("MANTRA")));
    }

    #[test]
    fn test_serde_uses_ticker() {
        let json = serde_json::to_string(&ChainId::Rvn).unwrap();
        assert_eq!(json, "\"RVN\"");
    }
}
