//! Where a request goes and under which service id.

use shared_bus::topics::{asset_query_topic, ASSET_SERVICE_REQUESTS};

/// Destination of a request.
///
/// The master addresses a worker on its query topic; a worker addresses the
/// master on the shared requests topic under its own id, so the master knows
/// which response topic to answer on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub topic: String,
    pub service_id: String,
}

impl RequestTarget {
    /// Master → worker `service_id`.
    pub fn worker(service_id: &str) -> Self {
        Self {
            topic: asset_query_topic(service_id),
            service_id: service_id.to_string(),
        }
    }

    /// Worker `own_id` → master.
    pub fn master(own_id: &str) -> Self {
        Self {
            topic: ASSET_SERVICE_REQUESTS.to_string(),
            service_id: own_id.to_string(),
        }
    }
}
