//! # Retry Envelope
//!
//! Every dispatched operation runs inside [`RetryPolicy::run`]. Only
//! transient failures (see [`WorkerError::is_transient`]) are retried; the
//! delay grows geometrically and the last error is returned once the attempt
//! budget is spent.

use super::errors::WorkerError;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    pub fn for_testing() -> Self {
        Self {
            initial_delay: Duration::from_millis(1),
            ..Self::default()
        }
    }

    /// Sleep before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay.mul_f64(self.multiplier.powi(retry as i32))
    }

    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.max_attempts == 0 {
            return Err(WorkerError::InvalidConfig("retry attempts must be positive".to_string()));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(WorkerError::InvalidConfig(format!(
                "backoff multiplier {} must be >= 1",
                self.multiplier
            )));
        }
        Ok(())
    }

    /// Run `op`, retrying transient failures.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, WorkerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, WorkerError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!(operation, attempts = attempt, error = %e, "Retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}
