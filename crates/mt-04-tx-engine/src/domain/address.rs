//! # Addresses
//!
//! Base58Check P2PKH/P2SH addresses and the hashes derived from keys and
//! scripts.

use super::errors::TxEngineError;
use super::network::ChainParams;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub type Hash160 = [u8; 20];

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD160(SHA256(data)).
pub fn hash160(data: &[u8]) -> Hash160 {
    Ripemd160::digest(sha256(data)).into()
}

/// Base58 with a four-byte double-SHA256 checksum.
pub fn base58check_encode(payload: &[u8]) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&sha256d(payload)[..4]);
    bs58::encode(data).into_string()
}

pub fn base58check_decode(encoded: &str) -> Result<Vec<u8>, TxEngineError> {
    let invalid = |reason: &str| TxEngineError::InvalidAddress {
        address: encoded.to_string(),
        reason: reason.to_string(),
    };
    let bytes = bs58::decode(encoded).into_vec().map_err(|e| invalid(&e.to_string()))?;
    if bytes.len() < 4 {
        return Err(invalid("shorter than the checksum"));
    }
    let (payload, checksum) = bytes.split_at(bytes.len() - 4);
    if checksum != &sha256d(payload)[..4] {
        return Err(invalid("checksum mismatch"));
    }
    Ok(payload.to_vec())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    P2pkh,
    P2sh,
}

/// A decoded address of a specific chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub kind: AddressKind,
    pub hash: Hash160,
}

impl Address {
    pub fn parse(params: &ChainParams, encoded: &str) -> Result<Self, TxEngineError> {
        let payload = base58check_decode(encoded)?;
        if payload.len() != 21 {
            return Err(TxEngineError::InvalidAddress {
                address: encoded.to_string(),
                reason: format!("payload is {} bytes, expected 21", payload.len()),
            });
        }
        let kind = match payload[0] {
            v if v == params.p2pkh_version => AddressKind::P2pkh,
            v if v == params.p2sh_version => AddressKind::P2sh,
            other => {
                return Err(TxEngineError::InvalidAddress {
                    address: encoded.to_string(),
                    reason: format!("version {other} does not belong to {}", params.chain),
                })
            }
        };
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);
        Ok(Self { kind, hash })
    }

    pub fn encode(&self, params: &ChainParams) -> String {
        let version = match self.kind {
            AddressKind::P2pkh => params.p2pkh_version,
            AddressKind::P2sh => params.p2sh_version,
        };
        let mut payload = Vec::with_capacity(21);
        payload.push(version);
        payload.extend_from_slice(&self.hash);
        base58check_encode(&payload)
    }

    pub fn p2pkh(hash: Hash160) -> Self {
        Self {
            kind: AddressKind::P2pkh,
            hash,
        }
    }
}

/// P2PKH address of a serialized public key.
pub fn pubkey_to_address(params: &ChainParams, pubkey: &[u8]) -> String {
    Address::p2pkh(hash160(pubkey)).encode(params)
}

/// Electrum scripthash: SHA-256 of the locking script, byte-reversed, hex.
pub fn scripthash(script: &[u8]) -> String {
    let mut digest = sha256(script);
    digest.reverse();
    hex::encode(digest)
}
