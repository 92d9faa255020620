//! Wire types for the trigger endpoints.
//!
//! The inbound shapes mirror the transport layer's event format: a
//! `requestContext` object carrying the transport-assigned connection
//! identifier, plus (for send events) the endpoint descriptor fields the
//! deployed variant ignores in favor of configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broadcast::{DeliveryFailure, FanoutReport};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub connection_id: String,
    /// Gateway host from the event; accepted but unused (endpoint comes
    /// from configuration)
    #[serde(default)]
    pub domain_name: Option<String>,
    /// Gateway stage from the event; accepted but unused
    #[serde(default)]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectEvent {
    pub request_context: RequestContext,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEvent {
    pub request_context: RequestContext,
}

/// Fixed-success trigger result; the transport layer only looks at the
/// status code field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub status_code: u16,
}

impl TriggerResponse {
    pub fn ok() -> Self {
        Self { status_code: 200 }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResponse {
    pub status_code: u16,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub truncated: bool,
    pub failures: Vec<DeliveryFailure>,
    pub timestamp: DateTime<Utc>,
}

impl From<FanoutReport> for BroadcastResponse {
    fn from(report: FanoutReport) -> Self {
        Self {
            status_code: 200,
            attempted: report.attempted,
            delivered: report.delivered,
            failed: report.failed(),
            truncated: report.truncated,
            failures: report.failures,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connect_event_wire_format() {
        let event: ConnectEvent = serde_json::from_value(json!({
            "requestContext": { "connectionId": "Lk3ad=" }
        }))
        .unwrap();
        assert_eq!(event.request_context.connection_id, "Lk3ad=");
        assert!(event.request_context.domain_name.is_none());
    }

    #[test]
    fn test_send_event_with_endpoint_descriptor() {
        let event: SendEvent = serde_json::from_value(json!({
            "requestContext": {
                "connectionId": "abc",
                "domainName": "gw.example.com",
                "stage": "dev"
            }
        }))
        .unwrap();
        assert_eq!(event.request_context.domain_name.as_deref(), Some("gw.example.com"));
        assert_eq!(event.request_context.stage.as_deref(), Some("dev"));
    }

    #[test]
    fn test_trigger_response_status_field() {
        let json = serde_json::to_value(TriggerResponse::ok()).unwrap();
        assert_eq!(json["statusCode"], 200);
    }

    #[test]
    fn test_broadcast_response_from_report() {
        let report = FanoutReport {
            attempted: 3,
            delivered: 2,
            failures: vec![DeliveryFailure {
                connection_id: "b".to_string(),
                error: "connection b is gone".to_string(),
            }],
            truncated: false,
        };
        let response = BroadcastResponse::from(report);
        assert_eq!(response.status_code, 200);
        assert_eq!(response.attempted, 3);
        assert_eq!(response.delivered, 2);
        assert_eq!(response.failed, 1);
    }
}
