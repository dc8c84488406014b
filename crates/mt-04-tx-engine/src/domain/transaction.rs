//! # Transaction Parts
//!
//! Inputs and outputs as the encoders see them, and the deterministic
//! BIP69-style order both encoders apply before writing bytes.
//!
//! | Part | Sort key |
//! |------|----------|
//! | input | positioning desc, prev tx hash asc, prev index desc |
//! | output | positioning desc, value asc, script asc |

use std::cmp::Ordering;

pub const FINAL_SEQUENCE: u32 = 0xffff_ffff;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Previous transaction id, hex in display order.
    pub prev_tx_hash: String,
    pub prev_index: u32,
    pub script: Vec<u8>,
    pub sequence: u32,
    /// Ordering priority; higher sorts first.
    pub positioning: i32,
}

impl TxInput {
    pub fn new(prev_tx_hash: impl Into<String>, prev_index: u32, script: Vec<u8>) -> Self {
        Self {
            prev_tx_hash: prev_tx_hash.into(),
            prev_index,
            script,
            sequence: FINAL_SEQUENCE,
            positioning: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub script: Vec<u8>,
    pub positioning: i32,
}

impl TxOutput {
    pub fn new(value: u64, script: Vec<u8>) -> Self {
        Self {
            value,
            script,
            positioning: 0,
        }
    }
}

pub fn input_order(a: &TxInput, b: &TxInput) -> Ordering {
    b.positioning
        .cmp(&a.positioning)
        .then_with(|| a.prev_tx_hash.to_ascii_lowercase().cmp(&b.prev_tx_hash.to_ascii_lowercase()))
        .then_with(|| b.prev_index.cmp(&a.prev_index))
}

pub fn output_order(a: &TxOutput, b: &TxOutput) -> Ordering {
    b.positioning
        .cmp(&a.positioning)
        .then_with(|| a.value.cmp(&b.value))
        .then_with(|| a.script.cmp(&b.script))
}

/// Indices of `items` in sorted order. Stable, so equal keys keep their
/// original relative order.
pub fn sorted_indices<T>(items: &[T], order: impl Fn(&T, &T) -> Ordering) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..items.len()).collect();
    indices.sort_by(|&i, &j| order(&items[i], &items[j]));
    indices
}
