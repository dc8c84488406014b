//! # Bus Envelopes
//!
//! JSON records carried on the bus topics.
//!
//! | Topic | Record | Direction |
//! |-------|--------|-----------|
//! | `asset-service-registry` | [`ServiceAnnouncement`] | worker → registry |
//! | `asset-heartbeats` | [`Heartbeat`] | worker → registry |
//! | `asset-query-<id>` | [`QueryEnvelope`] | master → worker |
//! | `asset-service-requests` | [`QueryEnvelope`] | worker → master |
//! | `asset-response-<id>` | [`ResponseEnvelope`] | both directions |

use crate::correlation::RequestId;
use crate::entities::ServiceDescriptor;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Worker self-registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAnnouncement {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub timestamp: Timestamp,
}

impl ServiceAnnouncement {
    pub fn new(descriptor: &ServiceDescriptor, timestamp: Timestamp) -> Self {
        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            service_type: descriptor.service_type.clone(),
            timestamp,
        }
    }

    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor::new(self.id.clone(), self.name.clone(), self.service_type.clone())
    }
}

/// Worker liveness signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    #[serde(rename = "assetId")]
    pub asset_id: String,
    pub timestamp: Timestamp,
}

/// A typed query as it travels inside a [`QueryEnvelope`]: `{type, request}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub request: Value,
}

/// Request published by the issuing side of an RPC.
///
/// `Q` defaults to a raw JSON value so a receiver can recover the request id
/// even when the query itself fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEnvelope<Q = Value> {
    pub request_id: RequestId,
    pub service_id: String,
    pub query: Q,
    pub timestamp: Timestamp,
}

impl QueryEnvelope<Value> {
    /// The query's `type` tag, if present.
    pub fn query_type(&self) -> Option<&str> {
        self.query.get("type").and_then(Value::as_str)
    }
}

/// Answer to a [`QueryEnvelope`]. Exactly one of `data` / `error` is meaningful;
/// an absent `data` without `error` is a successful `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub request_id: RequestId,
    pub service_id: String,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(request_id: RequestId, service_id: impl Into<String>, timestamp: Timestamp, data: Value) -> Self {
        Self {
            request_id,
            service_id: service_id.into(),
            timestamp,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(
        request_id: RequestId,
        service_id: impl Into<String>,
        timestamp: Timestamp,
        error: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            service_id: service_id.into(),
            timestamp,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Collapse into the caller-facing outcome.
    pub fn into_result(self) -> Result<Value, String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_heartbeat_wire_format() {
        let heartbeat: Heartbeat =
            serde_json::from_value(json!({"assetId": "EVR", "timestamp": 5})).unwrap();
        assert_eq!(heartbeat.asset_id, "EVR");
        assert_eq!(heartbeat.timestamp, 5);
    }

    #[test]
    fn test_query_envelope_wire_format() {
        let request_id = RequestId::new();
        let envelope = QueryEnvelope {
            request_id,
            service_id: "EVR".to_string(),
            query: json!({"type": "getAllUTXOs", "request": {"derivedIds": [1]}}),
            timestamp: 9,
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["requestId"], json!(request_id.to_string()));
        assert_eq!(value["serviceId"], "EVR");
        assert_eq!(envelope.query_type(), Some("getAllUTXOs"));
    }

    #[test]
    fn test_response_outcomes() {
        let id = RequestId::new();
        let ok = ResponseEnvelope::success(id, "EVR", 1, json!(true));
        assert_eq!(ok.into_result(), Ok(json!(true)));

        let err = ResponseEnvelope::failure(id, "EVR", 1, "No UTXOs found");
        let encoded = serde_json::to_value(&err).unwrap();
        assert!(encoded.get("data").is_none());
        assert_eq!(err.into_result(), Err("No UTXOs found".to_string()));

        let empty: ResponseEnvelope = serde_json::from_value(json!({
            "requestId": id.to_string(),
            "serviceId": "EVR",
            "timestamp": 1
        }))
        .unwrap();
        assert_eq!(empty.into_result(), Ok(Value::Null));
    }
}
