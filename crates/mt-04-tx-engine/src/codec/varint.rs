//! CompactSize integers used by the consensus and PSBT encodings.

use super::reader::ByteReader;
use crate::domain::TxEngineError;

pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    if value < 0xFD {
        out.push(value as u8);
    } else if value <= 0xFFFF {
        out.push(0xFD);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xFFFF_FFFF {
        out.push(0xFE);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xFF);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Read a CompactSize, rejecting non-minimal encodings.
pub fn read_varint(reader: &mut ByteReader<'_>) -> Result<u64, TxEngineError> {
    let tag = reader.read_u8()?;
    let (value, minimum) = match tag {
        value @ 0x00..=0xFC => return Ok(value as u64),
        0xFD => (reader.read_u16_le()? as u64, 0xFD),
        0xFE => (reader.read_u32_le()? as u64, 0x1_0000),
        0xFF => (reader.read_u64_le()?, 0x1_0000_0000),
    };
    if value < minimum {
        return Err(TxEngineError::Decode(format!("non-minimal varint tag {tag:#04x}")));
    }
    Ok(value)
}

/// Write a length-prefixed byte string.
pub fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

pub fn read_var_bytes<'a>(reader: &mut ByteReader<'a>) -> Result<&'a [u8], TxEngineError> {
    let len = read_varint(reader)?;
    let len = usize::try_from(len).map_err(|_| TxEngineError::Decode(format!("length {len} too large")))?;
    reader.read_bytes(len)
}
