//! Gap-limited derivation scanning.

use super::errors::WorkerError;
use shared_types::WalletId;
use std::ops::Range;

/// Receive chain.
pub const EXPOSURE_RECEIVE: u32 = 0;
/// Change chain.
pub const EXPOSURE_CHANGE: u32 = 1;

/// Walks one exposure of a wallet in batches of `gap` indices. The caller
/// asks for the next batch only while the previous one showed activity;
/// asking past `max_rounds` is an error rather than an endless scan.
#[derive(Debug, Clone)]
pub struct DerivationScan {
    wallet_id: WalletId,
    exposure: u32,
    gap: u32,
    max_rounds: usize,
    rounds: usize,
}

impl DerivationScan {
    pub fn new(wallet_id: WalletId, exposure: u32, gap: u32, max_rounds: usize) -> Self {
        Self {
            wallet_id,
            exposure,
            gap,
            max_rounds,
            rounds: 0,
        }
    }

    pub fn exposure(&self) -> u32 {
        self.exposure
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn next_batch(&mut self) -> Result<Range<u32>, WorkerError> {
        if self.rounds >= self.max_rounds {
            return Err(WorkerError::DerivationLimit {
                wallet_id: self.wallet_id,
                exposure: self.exposure,
                rounds: self.rounds,
            });
        }
        let start = self.gap.saturating_mul(self.rounds as u32);
        self.rounds += 1;
        Ok(start..start.saturating_add(self.gap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_are_contiguous() {
        let mut scan = DerivationScan::new(1, EXPOSURE_RECEIVE, 20, 50);
        assert_eq!(scan.next_batch().unwrap(), 0..20);
        assert_eq!(scan.next_batch().unwrap(), 20..40);
        assert_eq!(scan.rounds(), 2);
    }

    #[test]
    fn test_round_cap() {
        let mut scan = DerivationScan::new(7, EXPOSURE_CHANGE, 5, 2);
        scan.next_batch().unwrap();
        scan.next_batch().unwrap();
        assert_eq!(
            scan.next_batch(),
            Err(WorkerError::DerivationLimit {
                wallet_id: 7,
                exposure: 1,
                rounds: 2
            })
        );
    }
}
