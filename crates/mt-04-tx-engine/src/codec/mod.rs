//! # Wire Codecs
//!
//! Two transaction encodings live side by side and are picked per chain:
//!
//! | Chain | Encoder | Output |
//! |-------|---------|--------|
//! | EVR | [`RawTxEncoder`] | one-byte counts, input script = prevout locking script |
//! | RVN | [`PsbtTxEncoder`] | BIP174 container plus the unsigned consensus transaction |

pub mod encoder;
pub mod psbt;
pub mod raw;
pub mod reader;
pub mod varint;

pub use encoder::{encoder_for, EncodedTransaction, PsbtTxEncoder, RawTxEncoder, TxEncoder};
pub use psbt::{decode_consensus, encode_consensus, extract_unsigned, PsbtBuilder};
pub use raw::{decode_raw, encode_raw, RawTransaction, RAW_TX_VERSION};
pub use reader::ByteReader;
