//! # Public Key Derivation
//!
//! Non-hardened BIP32 child derivation from an extended public key. Wallets
//! that hold a single key register the raw compressed key instead; those pass
//! through unchanged for every index.

use super::address::{base58check_decode, base58check_encode, hash160, pubkey_to_address, scripthash};
use super::errors::TxEngineError;
use super::network::ChainParams;
use super::script::p2pkh_script;
use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{AffinePoint, FieldBytes, ProjectivePoint, PublicKey, SecretKey};
use sha2::Sha512;
use shared_types::{NewDerivedAddress, WalletId};

/// Mainnet `xpub` version bytes.
pub const XPUB_VERSION: [u8; 4] = [0x04, 0x88, 0xb2, 0x1e];

const EXTENDED_KEY_LEN: usize = 78;
const HARDENED_OFFSET: u32 = 0x8000_0000;

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedPublicKey {
    pub version: [u8; 4],
    pub depth: u8,
    pub parent_fingerprint: [u8; 4],
    pub child_number: u32,
    pub chain_code: [u8; 32],
    pub public_key: PublicKey,
}

impl ExtendedPublicKey {
    pub fn parse(encoded: &str) -> Result<Self, TxEngineError> {
        let payload = base58check_decode(encoded).map_err(|e| TxEngineError::InvalidKey(e.to_string()))?;
        if payload.len() != EXTENDED_KEY_LEN {
            return Err(TxEngineError::InvalidKey(format!(
                "expected {EXTENDED_KEY_LEN} bytes, got {}",
                payload.len()
            )));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&payload[0..4]);
        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&payload[5..9]);
        let mut child = [0u8; 4];
        child.copy_from_slice(&payload[9..13]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&payload[13..45]);
        let public_key = PublicKey::from_sec1_bytes(&payload[45..78])
            .map_err(|_| TxEngineError::InvalidKey("not a valid public key".to_string()))?;

        Ok(Self {
            version,
            depth: payload[4],
            parent_fingerprint,
            child_number: u32::from_be_bytes(child),
            chain_code,
            public_key,
        })
    }

    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(EXTENDED_KEY_LEN);
        payload.extend_from_slice(&self.version);
        payload.push(self.depth);
        payload.extend_from_slice(&self.parent_fingerprint);
        payload.extend_from_slice(&self.child_number.to_be_bytes());
        payload.extend_from_slice(&self.chain_code);
        payload.extend_from_slice(&self.compressed());
        base58check_encode(&payload)
    }

    pub fn compressed(&self) -> Vec<u8> {
        self.public_key.to_encoded_point(true).as_bytes().to_vec()
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        let hash = hash160(&self.compressed());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// CKDpub. Hardened indices need the private key and are rejected.
    pub fn derive_child(&self, index: u32) -> Result<Self, TxEngineError> {
        if index >= HARDENED_OFFSET {
            return Err(TxEngineError::InvalidKey(format!("index {index} is hardened")));
        }
        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|e| TxEngineError::InvalidKey(e.to_string()))?;
        mac.update(&self.compressed());
        mac.update(&index.to_be_bytes());
        let digest = mac.finalize().into_bytes();
        let (il, ir) = digest.split_at(32);

        let tweak = SecretKey::from_bytes(FieldBytes::from_slice(il))
            .map_err(|_| TxEngineError::InvalidKey(format!("index {index} yields an invalid tweak")))?;
        let point = self.public_key.to_projective() + ProjectivePoint::GENERATOR * *tweak.to_nonzero_scalar();
        let public_key = PublicKey::from_affine(AffinePoint::from(point))
            .map_err(|_| TxEngineError::InvalidKey(format!("index {index} yields the point at infinity")))?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);
        Ok(Self {
            version: self.version,
            depth: self.depth.saturating_add(1),
            parent_fingerprint: self.fingerprint(),
            child_number: index,
            chain_code,
            public_key,
        })
    }
}

/// Compressed public key, hex, at `exposure/index` below `wallet_key`.
pub fn derive_pubkey(wallet_key: &str, exposure: u32, index: u32) -> Result<String, TxEngineError> {
    if is_raw_pubkey(wallet_key) {
        return Ok(wallet_key.to_ascii_lowercase());
    }
    let child = ExtendedPublicKey::parse(wallet_key)?
        .derive_child(exposure)?
        .derive_child(index)?;
    Ok(hex::encode(child.compressed()))
}

/// Full derived-address record for `exposure/index`.
pub fn derive_address(
    params: &ChainParams,
    wallet_id: WalletId,
    wallet_key: &str,
    exposure: u32,
    index: u32,
) -> Result<NewDerivedAddress, TxEngineError> {
    let pubkey = derive_pubkey(wallet_key, exposure, index)?;
    let key_bytes = hex::decode(&pubkey)?;
    let address = pubkey_to_address(params, &key_bytes);
    Ok(NewDerivedAddress {
        wallet_id,
        scripthash: scripthash(&p2pkh_script(&hash160(&key_bytes))),
        pubkey,
        address,
        index,
        exposure,
    })
}

fn is_raw_pubkey(key: &str) -> bool {
    key.len() == 66
        && (key.starts_with("02") || key.starts_with("03"))
        && key.chars().all(|c| c.is_ascii_hexdigit())
}
