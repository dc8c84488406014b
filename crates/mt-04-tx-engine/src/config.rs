//! Transaction engine configuration.

/// Upper bound on fee-loop rounds before giving up.
pub const DEFAULT_MAX_FEE_ITERATIONS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxEngineConfig {
    pub max_fee_iterations: usize,
}

impl Default for TxEngineConfig {
    fn default() -> Self {
        Self {
            max_fee_iterations: DEFAULT_MAX_FEE_ITERATIONS,
        }
    }
}

impl TxEngineConfig {
    pub fn for_testing() -> Self {
        Self { max_fee_iterations: 8 }
    }
}
