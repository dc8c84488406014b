//! # Raw Encoding
//!
//! ```text
//! version(4 LE) | n_in(1) | input* | n_out(1) | output* | locktime(4 LE)
//! input  = prev_hash(32, reversed) | prev_index(4 LE) | script_len(1) | script | sequence(4 LE)
//! output = value(8 LE) | script_len(1) | script
//! ```
//!
//! Counts and script lengths are single bytes. The encoder writes parts in
//! the order given; callers sort first.

use super::reader::ByteReader;
use crate::domain::{TxEngineError, TxInput, TxOutput};

pub const RAW_TX_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub locktime: u32,
}

impl RawTransaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: RAW_TX_VERSION,
            inputs,
            outputs,
            locktime: 0,
        }
    }
}

/// Transaction id bytes in wire order (reversed display hex).
pub(crate) fn hash_to_wire(hash_hex: &str) -> Result<[u8; 32], TxEngineError> {
    let bytes = hex::decode(hash_hex)?;
    let mut wire: [u8; 32] = bytes
        .try_into()
        .map_err(|_| TxEngineError::Decode(format!("tx hash {hash_hex} is not 32 bytes")))?;
    wire.reverse();
    Ok(wire)
}

pub(crate) fn hash_from_wire(mut wire: [u8; 32]) -> String {
    wire.reverse();
    hex::encode(wire)
}

fn count_byte(kind: &'static str, count: usize) -> Result<u8, TxEngineError> {
    u8::try_from(count).map_err(|_| TxEngineError::TooManyEntries { kind, count })
}

fn script_len_byte(script: &[u8]) -> Result<u8, TxEngineError> {
    u8::try_from(script.len()).map_err(|_| TxEngineError::ScriptTooLong(script.len()))
}

pub fn encode_raw(tx: &RawTransaction) -> Result<Vec<u8>, TxEngineError> {
    let mut out = Vec::with_capacity(10 + tx.inputs.len() * 66 + tx.outputs.len() * 34);
    out.extend_from_slice(&tx.version.to_le_bytes());

    out.push(count_byte("input", tx.inputs.len())?);
    for input in &tx.inputs {
        out.extend_from_slice(&hash_to_wire(&input.prev_tx_hash)?);
        out.extend_from_slice(&input.prev_index.to_le_bytes());
        out.push(script_len_byte(&input.script)?);
        out.extend_from_slice(&input.script);
        out.extend_from_slice(&input.sequence.to_le_bytes());
    }

    out.push(count_byte("output", tx.outputs.len())?);
    for output in &tx.outputs {
        out.extend_from_slice(&output.value.to_le_bytes());
        out.push(script_len_byte(&output.script)?);
        out.extend_from_slice(&output.script);
    }

    out.extend_from_slice(&tx.locktime.to_le_bytes());
    Ok(out)
}

pub fn decode_raw(bytes: &[u8]) -> Result<RawTransaction, TxEngineError> {
    let mut reader = ByteReader::new(bytes);
    let version = reader.read_u32_le()?;

    let input_count = reader.read_u8()?;
    let mut inputs = Vec::with_capacity(input_count as usize);
    for _ in 0..input_count {
        let prev_tx_hash = hash_from_wire(reader.read_array()?);
        let prev_index = reader.read_u32_le()?;
        let script_len = reader.read_u8()? as usize;
        let script = reader.read_bytes(script_len)?.to_vec();
        let sequence = reader.read_u32_le()?;
        inputs.push(TxInput {
            prev_tx_hash,
            prev_index,
            script,
            sequence,
            positioning: 0,
        });
    }

    let output_count = reader.read_u8()?;
    let mut outputs = Vec::with_capacity(output_count as usize);
    for _ in 0..output_count {
        let value = reader.read_u64_le()?;
        let script_len = reader.read_u8()? as usize;
        let script = reader.read_bytes(script_len)?.to_vec();
        outputs.push(TxOutput::new(value, script));
    }

    let locktime = reader.read_u32_le()?;
    reader.finish()?;
    Ok(RawTransaction {
        version,
        inputs,
        outputs,
        locktime,
    })
}
