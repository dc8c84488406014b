//! Topic names shared by the master and the workers.

/// Worker self-registration announcements.
pub const ASSET_SERVICE_REGISTRY: &str = "asset-service-registry";

/// Worker liveness signals.
pub const ASSET_HEARTBEATS: &str = "asset-heartbeats";

/// Worker-initiated queries to the master.
pub const ASSET_SERVICE_REQUESTS: &str = "asset-service-requests";

/// Prefix of the per-worker query topics.
pub const ASSET_QUERY_PREFIX: &str = "asset-query-";

/// Prefix of the per-worker response topics.
pub const ASSET_RESPONSE_PREFIX: &str = "asset-response-";

/// Topic a worker listens on for queries.
pub fn asset_query_topic(service_id: &str) -> String {
    format!("{ASSET_QUERY_PREFIX}{service_id}")
}

/// Topic carrying responses that concern `service_id`, in either direction.
pub fn asset_response_topic(service_id: &str) -> String {
    format!("{ASSET_RESPONSE_PREFIX}{service_id}")
}
