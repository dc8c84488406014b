//! Coin ↔ satoshi conversion at the query boundary.

use super::errors::WorkerError;

pub const SATS_PER_COIN: u64 = 100_000_000;

/// `sats` as a coin amount with eight decimals.
pub fn format_coins(sats: u64) -> String {
    format!("{}.{:08}", sats / SATS_PER_COIN, sats % SATS_PER_COIN)
}

/// Convert a requested coin amount to satoshis, rounding to the nearest unit.
pub fn coins_to_sats(amount: f64) -> Result<u64, WorkerError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(WorkerError::InvalidRequest(format!("output amount {amount} must be positive")));
    }
    let sats = (amount * SATS_PER_COIN as f64).round();
    if sats < 1.0 || sats >= u64::MAX as f64 {
        return Err(WorkerError::InvalidRequest(format!("output amount {amount} is out of range")));
    }
    Ok(sats as u64)
}
