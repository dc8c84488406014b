//! # Pending Requests
//!
//! Maps request ids to callers awaiting a bus response.
//!
//! Flow:
//! 1. `register()` mints a [`RequestId`] and hands back a oneshot receiver
//! 2. the correlator publishes the query carrying that id
//! 3. the response listener calls `complete()` when the answer arrives
//! 4. the caller awaits the receiver under its timeout and calls `cancel()`
//!    when the timeout fires first

use super::errors::RpcError;
use dashmap::DashMap;
use serde_json::Value;
use shared_types::RequestId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// What the caller eventually receives.
pub type RpcOutcome = Result<Value, RpcError>;

struct PendingRequest {
    sender: oneshot::Sender<RpcOutcome>,
    created_at: Instant,
    service_id: String,
    query_type: String,
    timeout: Duration,
}

#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_timeouts: AtomicU64,
    /// Completions whose caller had already gone away.
    pub total_cancelled: AtomicU64,
    /// Responses with no pending entry (late or foreign).
    pub total_unmatched: AtomicU64,
}

pub struct PendingRequestStore {
    pending: DashMap<RequestId, PendingRequest>,
    default_timeout: Duration,
    stats: Arc<PendingStats>,
}

impl PendingRequestStore {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            default_timeout,
            stats: Arc::new(PendingStats::default()),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Register a request. The id is minted here, on the issuing side.
    pub fn register(
        &self,
        service_id: &str,
        query_type: &str,
        timeout: Option<Duration>,
    ) -> (RequestId, oneshot::Receiver<RpcOutcome>) {
        let request_id = RequestId::new();
        let (tx, rx) = oneshot::channel();

        self.pending.insert(
            request_id,
            PendingRequest {
                sender: tx,
                created_at: Instant::now(),
                service_id: service_id.to_string(),
                query_type: query_type.to_string(),
                timeout: timeout.unwrap_or(self.default_timeout),
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        debug!(request_id = %request_id, service_id, query_type, "Registered pending request");

        (request_id, rx)
    }

    /// Resolve a pending request with the responder's `data` or `error`.
    ///
    /// Returns false when no entry matches, which is the normal outcome for a
    /// response that lost the race against its timeout.
    pub fn complete(&self, request_id: RequestId, result: Result<Value, String>) -> bool {
        let Some((_, pending)) = self.pending.remove(&request_id) else {
            self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            debug!(request_id = %request_id, "Dropping response with no pending request");
            return false;
        };

        let elapsed = pending.created_at.elapsed();
        match pending.sender.send(result.map_err(RpcError::Remote)) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %request_id,
                    service_id = pending.service_id,
                    query_type = pending.query_type,
                    response_time_ms = elapsed.as_millis() as u64,
                    "Completed pending request"
                );
                true
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(request_id = %request_id, "Caller dropped before the response arrived");
                false
            }
        }
    }

    /// Reject and remove entries older than their timeout. Catches callers
    /// that stopped awaiting without cancelling.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|entry| now.duration_since(entry.created_at) > entry.timeout)
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for request_id in expired {
            if let Some((_, pending)) = self.pending.remove(&request_id) {
                warn!(
                    request_id = %request_id,
                    service_id = pending.service_id,
                    query_type = pending.query_type,
                    timeout_ms = pending.timeout.as_millis() as u64,
                    "Removing expired pending request"
                );
                let _ = pending.sender.send(Err(RpcError::Timeout {
                    request_id,
                    service_id: pending.service_id,
                    timeout_ms: pending.timeout.as_millis() as u64,
                }));
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                removed += 1;
            }
        }
        removed
    }

    /// Remove an entry whose caller has given up. Counts as a timeout.
    pub fn expire(&self, request_id: &RequestId) -> bool {
        if self.pending.remove(request_id).is_some() {
            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Remove an entry whose request never left (publish failure).
    pub fn cancel(&self, request_id: &RequestId) -> bool {
        if self.pending.remove(request_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.contains_key(request_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

/// Periodically reject expired entries until `shutdown` flips.
pub async fn cleanup_task(store: Arc<PendingRequestStore>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cleanup_interval.tick() => {
                let removed = store.remove_expired();
                if removed > 0 {
                    debug!(removed, "Cleaned up expired pending requests");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
