//! # PSBT Encoding
//!
//! BIP174 container used by the RVN signer:
//!
//! ```text
//! "psbt" 0xff
//! global:  {0x00 -> unsigned tx} 0x00
//! input i: {0x00 -> full previous transaction} 0x00
//! output:  0x00
//! ```
//!
//! The unsigned transaction uses consensus serialization (CompactSize counts)
//! with empty input scripts.

use super::raw::{hash_from_wire, hash_to_wire, RawTransaction};
use super::reader::ByteReader;
use super::varint::{read_var_bytes, read_varint, write_var_bytes, write_varint};
use crate::domain::{TxEngineError, TxInput, TxOutput};

pub const PSBT_MAGIC: [u8; 5] = *b"psbt\xff";
pub const PSBT_TX_VERSION: u32 = 1;

const PSBT_GLOBAL_UNSIGNED_TX: u8 = 0x00;
const PSBT_IN_NON_WITNESS_UTXO: u8 = 0x00;
const SEPARATOR: u8 = 0x00;

pub fn encode_consensus(tx: &RawTransaction) -> Result<Vec<u8>, TxEngineError> {
    let mut out = Vec::new();
    out.extend_from_slice(&tx.version.to_le_bytes());
    write_varint(&mut out, tx.inputs.len() as u64);
    for input in &tx.inputs {
        out.extend_from_slice(&hash_to_wire(&input.prev_tx_hash)?);
        out.extend_from_slice(&input.prev_index.to_le_bytes());
        write_var_bytes(&mut out, &input.script);
        out.extend_from_slice(&input.sequence.to_le_bytes());
    }
    write_varint(&mut out, tx.outputs.len() as u64);
    for output in &tx.outputs {
        out.extend_from_slice(&output.value.to_le_bytes());
        write_var_bytes(&mut out, &output.script);
    }
    out.extend_from_slice(&tx.locktime.to_le_bytes());
    Ok(out)
}

fn read_consensus(reader: &mut ByteReader<'_>) -> Result<RawTransaction, TxEngineError> {
    let version = reader.read_u32_le()?;
    let input_count = read_varint(reader)?;
    let mut inputs = Vec::new();
    for _ in 0..input_count {
        let prev_tx_hash = hash_from_wire(reader.read_array()?);
        let prev_index = reader.read_u32_le()?;
        let script = read_var_bytes(reader)?.to_vec();
        let sequence = reader.read_u32_le()?;
        inputs.push(TxInput {
            prev_tx_hash,
            prev_index,
            script,
            sequence,
            positioning: 0,
        });
    }
    let output_count = read_varint(reader)?;
    let mut outputs = Vec::new();
    for _ in 0..output_count {
        let value = reader.read_u64_le()?;
        let script = read_var_bytes(reader)?.to_vec();
        outputs.push(TxOutput::new(value, script));
    }
    let locktime = reader.read_u32_le()?;
    Ok(RawTransaction {
        version,
        inputs,
        outputs,
        locktime,
    })
}

pub fn decode_consensus(bytes: &[u8]) -> Result<RawTransaction, TxEngineError> {
    let mut reader = ByteReader::new(bytes);
    let tx = read_consensus(&mut reader)?;
    reader.finish()?;
    Ok(tx)
}

/// Assembles a PSBT around an unsigned transaction.
pub struct PsbtBuilder {
    unsigned: RawTransaction,
    previous: Vec<Vec<u8>>,
}

impl PsbtBuilder {
    /// `previous[i]` is the full transaction spent by input `i`.
    pub fn new(unsigned: RawTransaction, previous: Vec<Vec<u8>>) -> Result<Self, TxEngineError> {
        if previous.len() != unsigned.inputs.len() {
            return Err(TxEngineError::Decode(format!(
                "{} previous transactions for {} inputs",
                previous.len(),
                unsigned.inputs.len()
            )));
        }
        Ok(Self { unsigned, previous })
    }

    pub fn unsigned_bytes(&self) -> Result<Vec<u8>, TxEngineError> {
        encode_consensus(&self.unsigned)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, TxEngineError> {
        let mut out = PSBT_MAGIC.to_vec();

        write_var_bytes(&mut out, &[PSBT_GLOBAL_UNSIGNED_TX]);
        write_var_bytes(&mut out, &self.unsigned_bytes()?);
        out.push(SEPARATOR);

        for previous in &self.previous {
            write_var_bytes(&mut out, &[PSBT_IN_NON_WITNESS_UTXO]);
            write_var_bytes(&mut out, previous);
            out.push(SEPARATOR);
        }
        for _ in &self.unsigned.outputs {
            out.push(SEPARATOR);
        }
        Ok(out)
    }
}

/// Pull the unsigned transaction bytes out of a serialized PSBT.
pub fn extract_unsigned(psbt: &[u8]) -> Result<Vec<u8>, TxEngineError> {
    let mut reader = ByteReader::new(psbt);
    if reader.read_bytes(PSBT_MAGIC.len())? != PSBT_MAGIC {
        return Err(TxEngineError::Decode("missing psbt magic".to_string()));
    }
    let mut unsigned = None;
    loop {
        let key = read_var_bytes(&mut reader)?;
        if key.is_empty() {
            break;
        }
        let value = read_var_bytes(&mut reader)?;
        if key == [PSBT_GLOBAL_UNSIGNED_TX] {
            unsigned = Some(value.to_vec());
        }
    }
    unsigned.ok_or_else(|| TxEngineError::Decode("psbt has no unsigned transaction".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawTransaction {
        RawTransaction {
            version: PSBT_TX_VERSION,
            inputs: vec![TxInput::new(hex::encode([3u8; 32]), 2, vec![])],
            outputs: vec![TxOutput::new(1_000, vec![0x76, 0xa9]), TxOutput::new(0, vec![0x51])],
            locktime: 0,
        }
    }

    #[test]
    fn test_consensus_roundtrip() {
        let tx = sample();
        let bytes = encode_consensus(&tx).unwrap();
        assert_eq!(&bytes[..4], &[1, 0, 0, 0]);
        assert_eq!(decode_consensus(&bytes).unwrap(), tx);
    }

    #[test]
    fn test_psbt_layout_and_extraction() {
        let tx = sample();
        let builder = PsbtBuilder::new(tx.clone(), vec![vec![0xde, 0xad]]).unwrap();
        let psbt = builder.serialize().unwrap();

        assert_eq!(&psbt[..5], b"psbt\xff");
        // global key: len 1, type 0x00
        assert_eq!(&psbt[5..7], &[0x01, 0x00]);
        // one input map + two output maps each end in a separator
        assert_eq!(&psbt[psbt.len() - 2..], &[0x00, 0x00]);

        let unsigned = extract_unsigned(&psbt).unwrap();
        assert_eq!(unsigned, builder.unsigned_bytes().unwrap());
        assert_eq!(decode_consensus(&unsigned).unwrap(), tx);
    }

    #[test]
    fn test_previous_count_must_match_inputs() {
        assert!(PsbtBuilder::new(sample(), vec![]).is_err());
    }

    #[test]
    fn test_extract_rejects_garbage() {
        assert!(extract_unsigned(b"nope!").is_err());
    }
}
