//! # Fee Model
//!
//! `weight = bytes*3 + inputs*148 + outputs*34 + 10` and
//! `fee = round(weight / 4 * sat_per_byte)`, with the per-byte rate rounded
//! to one decimal.

use super::errors::TxEngineError;

/// Satoshis per kilobyte used when a request names no rate.
pub const DEFAULT_FEE_RATE_KB: f64 = 1_000_000.0;

pub fn transaction_weight(byte_len: usize, inputs: usize, outputs: usize) -> u64 {
    (byte_len as u64) * 3 + (inputs as u64) * 148 + (outputs as u64) * 34 + 10
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRate {
    sat_per_byte: f64,
}

impl FeeRate {
    pub fn from_per_kb(sat_per_kb: f64) -> Result<Self, TxEngineError> {
        if !sat_per_kb.is_finite() || sat_per_kb < 0.0 {
            return Err(TxEngineError::InvalidFeeRate(sat_per_kb.to_string()));
        }
        let sat_per_byte = (sat_per_kb / 1000.0 * 10.0).round() / 10.0;
        Ok(Self { sat_per_byte })
    }

    pub fn sat_per_byte(&self) -> f64 {
        self.sat_per_byte
    }

    pub fn fee_for_weight(&self, weight: u64) -> u64 {
        (weight as f64 / 4.0 * self.sat_per_byte).round() as u64
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self {
            sat_per_byte: DEFAULT_FEE_RATE_KB / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_rounding() {
        assert_eq!(FeeRate::from_per_kb(1_025_000.0).unwrap().sat_per_byte(), 1025.0);
        assert_eq!(FeeRate::from_per_kb(1_234.0).unwrap().sat_per_byte(), 1.2);
        assert!(FeeRate::from_per_kb(-1.0).is_err());
        assert!(FeeRate::from_per_kb(f64::NAN).is_err());
    }

    #[test]
    fn test_fee_for_one_in_two_out() {
        let weight = transaction_weight(119, 1, 2);
        assert_eq!(weight, 583);
        // 1457.5 rounds half away from zero
        assert_eq!(FeeRate::from_per_kb(10_000.0).unwrap().fee_for_weight(weight), 1458);
    }
}
