//! # Locking Scripts
//!
//! Standard P2PKH/P2SH scripts plus the asset transfer extension:
//!
//! ```text
//! OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG OP_ASSET <payload> OP_DROP
//!
//! payload = tag(3) 't' len(1) name amount(8 LE) [0x01 len(1) memo [timestamp(8 LE)]]
//! ```

use super::address::{Address, AddressKind, Hash160};
use super::errors::TxEngineError;
use super::network::ChainParams;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_ASSET: u8 = 0xc0;

/// Marker byte between the chain tag and the asset name of a transfer.
const TRANSFER_MARKER: u8 = b't';
const MEMO_MARKER: u8 = 0x01;
const MAX_ASSET_NAME_LEN: usize = 32;

/// Append a minimal data push.
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= 0xff {
        script.extend_from_slice(&[OP_PUSHDATA1, len as u8]);
    } else if len <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

pub fn p2pkh_script(hash: &Hash160) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160];
    push_data(&mut script, hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

pub fn p2sh_script(hash: &Hash160) -> Vec<u8> {
    let mut script = vec![OP_HASH160];
    push_data(&mut script, hash);
    script.push(OP_EQUAL);
    script
}

/// An asset transfer carried by an output script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTransfer {
    pub name: String,
    /// Satoshi-denominated asset amount.
    pub amount: u64,
    pub memo: Option<Vec<u8>>,
    /// Only encoded together with a memo.
    pub timestamp: Option<u64>,
}

impl AssetTransfer {
    pub fn new(name: impl Into<String>, amount: u64) -> Self {
        Self {
            name: name.into(),
            amount,
            memo: None,
            timestamp: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<Vec<u8>>, timestamp: Option<u64>) -> Self {
        self.memo = Some(memo.into());
        self.timestamp = timestamp;
        self
    }

    pub fn encode(&self, tag: &[u8; 3]) -> Result<Vec<u8>, TxEngineError> {
        let name = self.name.as_bytes();
        if name.is_empty() || name.len() > MAX_ASSET_NAME_LEN {
            return Err(TxEngineError::InvalidAssetName(self.name.clone()));
        }

        let mut payload = Vec::with_capacity(4 + 1 + name.len() + 8);
        payload.extend_from_slice(tag);
        payload.push(TRANSFER_MARKER);
        payload.push(name.len() as u8);
        payload.extend_from_slice(name);
        payload.extend_from_slice(&self.amount.to_le_bytes());

        if let Some(memo) = &self.memo {
            if memo.len() > 0xff {
                return Err(TxEngineError::MemoTooLong(memo.len()));
            }
            payload.push(MEMO_MARKER);
            payload.push(memo.len() as u8);
            payload.extend_from_slice(memo);
            if let Some(timestamp) = self.timestamp {
                payload.extend_from_slice(&timestamp.to_le_bytes());
            }
        }
        Ok(payload)
    }

    /// Decode a payload produced by [`AssetTransfer::encode`]. The chain tag
    /// is not checked.
    pub fn decode(payload: &[u8]) -> Result<Self, TxEngineError> {
        let bad = |reason: &str| TxEngineError::Decode(format!("asset payload: {reason}"));
        if payload.len() < 5 || payload[3] != TRANSFER_MARKER {
            return Err(bad("missing transfer marker"));
        }
        let name_len = payload[4] as usize;
        let name_end = 5 + name_len;
        let amount_end = name_end + 8;
        if name_len == 0 || payload.len() < amount_end {
            return Err(bad("truncated"));
        }
        let name = std::str::from_utf8(&payload[5..name_end])
            .map_err(|_| bad("asset name is not utf-8"))?
            .to_string();
        let mut amount = [0u8; 8];
        amount.copy_from_slice(&payload[name_end..amount_end]);
        let mut transfer = AssetTransfer::new(name, u64::from_le_bytes(amount));

        let rest = &payload[amount_end..];
        if rest.is_empty() {
            return Ok(transfer);
        }
        if rest[0] != MEMO_MARKER || rest.len() < 2 {
            return Err(bad("unexpected trailing data"));
        }
        let memo_len = rest[1] as usize;
        let memo_end = 2 + memo_len;
        if rest.len() < memo_end {
            return Err(bad("truncated memo"));
        }
        transfer.memo = Some(rest[2..memo_end].to_vec());
        match rest.len() - memo_end {
            0 => {}
            8 => {
                let mut ts = [0u8; 8];
                ts.copy_from_slice(&rest[memo_end..]);
                transfer.timestamp = Some(u64::from_le_bytes(ts));
            }
            _ => return Err(bad("malformed timestamp")),
        }
        Ok(transfer)
    }
}

/// Append `OP_ASSET <payload> OP_DROP` to a locking script.
pub fn append_asset(script: &mut Vec<u8>, params: &ChainParams, transfer: &AssetTransfer) -> Result<(), TxEngineError> {
    let payload = transfer.encode(&params.asset_tag)?;
    script.push(OP_ASSET);
    push_data(script, &payload);
    script.push(OP_DROP);
    Ok(())
}

/// Locking script paying `address`, carrying `transfer` when present.
pub fn output_script(
    params: &ChainParams,
    address: &str,
    transfer: Option<&AssetTransfer>,
) -> Result<Vec<u8>, TxEngineError> {
    let address = Address::parse(params, address)?;
    let mut script = match address.kind {
        AddressKind::P2pkh => p2pkh_script(&address.hash),
        AddressKind::P2sh => p2sh_script(&address.hash),
    };
    if let Some(transfer) = transfer {
        append_asset(&mut script, params, transfer)?;
    }
    Ok(script)
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Locking script family of a spent output, as the signer needs to know it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptType {
    P2pkh,
    P2sh,
    P2pk,
    Unknown,
}

impl ScriptType {
    pub fn detect(script: &[u8]) -> Self {
        let is_p2pkh_prefix = script.len() >= 25
            && script[..3] == [OP_DUP, OP_HASH160, 20]
            && script[23..25] == [OP_EQUALVERIFY, OP_CHECKSIG];
        if is_p2pkh_prefix && (script.len() == 25 || script[25] == OP_ASSET) {
            return ScriptType::P2pkh;
        }
        if script.len() == 23 && script[..2] == [OP_HASH160, 20] && script[22] == OP_EQUAL {
            return ScriptType::P2sh;
        }
        let is_p2pk = |key_len: usize| {
            script.len() == key_len + 2 && script[0] as usize == key_len && script[key_len + 1] == OP_CHECKSIG
        };
        if is_p2pk(33) || is_p2pk(65) {
            return ScriptType::P2pk;
        }
        ScriptType::Unknown
    }

    /// Code the signer expects in `vinLockingScriptType`.
    pub fn signer_code(&self) -> i8 {
        match self {
            ScriptType::P2pkh => 0,
            ScriptType::P2sh => 1,
            ScriptType::P2pk => 2,
            ScriptType::Unknown => -1,
        }
    }
}

/// One parsed script element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOp {
    Push(Vec<u8>),
    Op(u8),
}

pub fn parse_script(script: &[u8]) -> Result<Vec<ScriptOp>, TxEngineError> {
    let truncated = || TxEngineError::Decode("script push runs past the end".to_string());
    let mut ops = Vec::new();
    let mut i = 0;
    while i < script.len() {
        let opcode = script[i];
        i += 1;
        let len = match opcode {
            0x01..=0x4b => opcode as usize,
            OP_PUSHDATA1 => {
                let len = *script.get(i).ok_or_else(truncated)? as usize;
                i += 1;
                len
            }
            OP_PUSHDATA2 => {
                let bytes = script.get(i..i + 2).ok_or_else(truncated)?;
                i += 2;
                u16::from_le_bytes([bytes[0], bytes[1]]) as usize
            }
            OP_PUSHDATA4 => {
                let bytes = script.get(i..i + 4).ok_or_else(truncated)?;
                i += 4;
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
            }
            op => {
                ops.push(ScriptOp::Op(op));
                continue;
            }
        };
        let data = script.get(i..i + len).ok_or_else(truncated)?;
        ops.push(ScriptOp::Push(data.to_vec()));
        i += len;
    }
    Ok(ops)
}

fn opcode_name(op: u8) -> String {
    match op {
        OP_0 => "OP_0".into(),
        OP_DROP => "OP_DROP".into(),
        OP_DUP => "OP_DUP".into(),
        OP_EQUAL => "OP_EQUAL".into(),
        OP_EQUALVERIFY => "OP_EQUALVERIFY".into(),
        OP_HASH160 => "OP_HASH160".into(),
        OP_CHECKSIG => "OP_CHECKSIG".into(),
        OP_ASSET => "OP_ASSET".into(),
        0x51..=0x60 => format!("OP_{}", op - 0x50),
        other => format!("OP_UNKNOWN_{other:#04x}"),
    }
}

/// Human-readable script, pushes rendered as hex.
pub fn disassemble(script: &[u8]) -> String {
    match parse_script(script) {
        Ok(ops) => ops
            .iter()
            .map(|op| match op {
                ScriptOp::Push(data) => hex::encode(data),
                ScriptOp::Op(code) => opcode_name(*code),
            })
            .collect::<Vec<_>>()
            .join(" "),
        Err(_) => "[error]".to_string(),
    }
}

/// What an output script pays to and carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedOutput {
    pub script_type: ScriptType,
    pub addresses: Vec<String>,
    pub asset: Option<AssetTransfer>,
    pub asm: String,
}

pub fn decode_output_script(params: &ChainParams, script: &[u8]) -> DecodedOutput {
    let script_type = ScriptType::detect(script);
    let addresses = match script_type {
        ScriptType::P2pkh => {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&script[3..23]);
            vec![Address::p2pkh(hash).encode(params)]
        }
        ScriptType::P2sh => {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&script[2..22]);
            vec![Address {
                kind: AddressKind::P2sh,
                hash,
            }
            .encode(params)]
        }
        ScriptType::P2pk => {
            vec![super::address::pubkey_to_address(params, &script[1..script.len() - 1])]
        }
        ScriptType::Unknown => Vec::new(),
    };

    let asset = if script_type == ScriptType::P2pkh && script.len() > 25 {
        match parse_script(&script[26..]).ok().as_deref() {
            Some([ScriptOp::Push(payload), ..]) => AssetTransfer::decode(payload).ok(),
            _ => None,
        }
    } else {
        None
    };

    DecodedOutput {
        script_type,
        addresses,
        asset,
        asm: disassemble(script),
    }
}
