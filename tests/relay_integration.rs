//! Cross-component integration tests
//!
//! These tests verify the registrar and broadcaster against the in-memory
//! registry and a scripted gateway, including the trigger-layer contracts,
//! without requiring Redis or server startup.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::Json;

use socket_relay::api::{self, ConnectEvent, RequestContext, SendEvent};
use socket_relay::broadcast::Broadcaster;
use socket_relay::config::{
    BroadcastConfig, GatewayConfig, RegistryConfig, ServerConfig, Settings,
};
use socket_relay::gateway::{GatewayError, PushGateway};
use socket_relay::registrar::ConnectionRegistrar;
use socket_relay::registry::{
    ConnectionRecord, ConnectionRegistry, MemoryRegistry, RegistryError, ScanPage,
};
use socket_relay::server::AppState;

/// Gateway test double: records deliveries, reports configured identifiers
/// as gone.
struct ScriptedGateway {
    sent: Mutex<Vec<(String, Vec<u8>)>>,
    fail_for: HashSet<String>,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: HashSet::new(),
        }
    }

    fn failing_for(ids: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn delivered_ids(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl PushGateway for ScriptedGateway {
    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: &[u8],
    ) -> Result<(), GatewayError> {
        if self.fail_for.contains(connection_id) {
            return Err(GatewayError::Gone(connection_id.to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((connection_id.to_string(), payload.to_vec()));
        Ok(())
    }
}

/// Registry test double where every operation fails.
struct FailingRegistry;

#[async_trait]
impl ConnectionRegistry for FailingRegistry {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn put(&self, _record: &ConnectionRecord) -> Result<(), RegistryError> {
        Err(RegistryError::Other("injected write failure".to_string()))
    }

    async fn delete(&self, _connection_id: &str) -> Result<(), RegistryError> {
        Err(RegistryError::Other("injected delete failure".to_string()))
    }

    async fn scan(
        &self,
        _cursor: Option<String>,
        _limit: usize,
    ) -> Result<ScanPage, RegistryError> {
        Err(RegistryError::Other("injected scan failure".to_string()))
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        Err(RegistryError::Other("injected count failure".to_string()))
    }
}

/// Registry test double: serves one page, then fails on the continuation
/// scan.
struct TruncatingRegistry;

#[async_trait]
impl ConnectionRegistry for TruncatingRegistry {
    fn backend_name(&self) -> &'static str {
        "truncating"
    }

    async fn put(&self, _record: &ConnectionRecord) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn delete(&self, _connection_id: &str) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn scan(
        &self,
        cursor: Option<String>,
        _limit: usize,
    ) -> Result<ScanPage, RegistryError> {
        match cursor {
            None => Ok(ScanPage {
                records: vec![ConnectionRecord::new("a"), ConnectionRecord::new("b")],
                next: Some("1".to_string()),
            }),
            Some(_) => Err(RegistryError::Other("injected scan failure".to_string())),
        }
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        Ok(2)
    }
}

/// Registry test double repeating an identifier across scan pages, the way
/// a Redis SCAN iteration may.
struct RepeatingScanRegistry;

#[async_trait]
impl ConnectionRegistry for RepeatingScanRegistry {
    fn backend_name(&self) -> &'static str {
        "repeating"
    }

    async fn put(&self, _record: &ConnectionRecord) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn delete(&self, _connection_id: &str) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn scan(
        &self,
        cursor: Option<String>,
        _limit: usize,
    ) -> Result<ScanPage, RegistryError> {
        match cursor {
            None => Ok(ScanPage {
                records: vec![ConnectionRecord::new("a"), ConnectionRecord::new("b")],
                next: Some("1".to_string()),
            }),
            Some(_) => Ok(ScanPage {
                records: vec![ConnectionRecord::new("b"), ConnectionRecord::new("c")],
                next: None,
            }),
        }
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        Ok(3)
    }
}

fn test_settings(response_message: &str, scan_page_size: usize) -> Settings {
    Settings {
        server: ServerConfig::default(),
        registry: RegistryConfig::default(),
        gateway: GatewayConfig::default(),
        broadcast: BroadcastConfig {
            response_message: response_message.to_string(),
            scan_page_size,
        },
    }
}

fn test_state(
    registry: Arc<dyn ConnectionRegistry>,
    gateway: Arc<dyn PushGateway>,
) -> AppState {
    AppState::with_backends(test_settings("hello", 100), registry, gateway).unwrap()
}

fn connect_event(connection_id: &str) -> ConnectEvent {
    ConnectEvent {
        request_context: RequestContext {
            connection_id: connection_id.to_string(),
            domain_name: None,
            stage: None,
        },
    }
}

fn send_event(connection_id: &str) -> SendEvent {
    SendEvent {
        request_context: RequestContext {
            connection_id: connection_id.to_string(),
            domain_name: None,
            stage: None,
        },
    }
}

mod registrar_contract {
    use super::*;

    #[tokio::test]
    async fn test_connect_succeeds_when_registry_write_fails() {
        let state = test_state(Arc::new(FailingRegistry), Arc::new(ScriptedGateway::new()));

        let response = api::connect(State(state.clone()), Json(connect_event("c1")))
            .await
            .expect("connect must not fail over a registry fault");
        assert_eq!(response.0.status_code, 200);

        assert_eq!(state.registrar.stats().failed_writes, 1);
        assert_eq!(state.registrar.stats().registered, 0);
    }

    #[tokio::test]
    async fn test_disconnect_succeeds_when_registry_delete_fails() {
        let state = test_state(Arc::new(FailingRegistry), Arc::new(ScriptedGateway::new()));

        let response = api::disconnect(State(state), Json(connect_event("c1")))
            .await
            .expect("disconnect must not fail over a registry fault");
        assert_eq!(response.0.status_code, 200);
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_connection_id() {
        let state = test_state(
            Arc::new(MemoryRegistry::new()),
            Arc::new(ScriptedGateway::new()),
        );

        let result = api::connect(State(state), Json(connect_event(""))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_connect_twice_keeps_one_record() {
        let registry = Arc::new(MemoryRegistry::new());
        let state = test_state(registry.clone(), Arc::new(ScriptedGateway::new()));

        api::connect(State(state.clone()), Json(connect_event("c1")))
            .await
            .unwrap();
        api::connect(State(state), Json(connect_event("c1")))
            .await
            .unwrap();

        assert_eq!(registry.count().await.unwrap(), 1);
    }
}

mod broadcast_contract {
    use super::*;

    #[tokio::test]
    async fn test_scan_failure_yields_zero_deliveries_and_success() {
        let gateway = Arc::new(ScriptedGateway::new());
        let state = test_state(Arc::new(FailingRegistry), gateway.clone());

        let response = api::broadcast(State(state)).await;
        assert_eq!(response.0.status_code, 200);
        assert_eq!(response.0.attempted, 0);
        assert_eq!(response.0.delivered, 0);
        assert!(response.0.truncated);
        assert!(gateway.delivered_ids().is_empty());
    }

    #[tokio::test]
    async fn test_one_failed_recipient_does_not_abort_fanout() {
        let registry = Arc::new(MemoryRegistry::new());
        for id in ["a", "b", "c"] {
            registry.put(&ConnectionRecord::new(id)).await.unwrap();
        }
        let gateway = Arc::new(ScriptedGateway::failing_for(&["b"]));
        let broadcaster =
            Broadcaster::new(registry, gateway.clone(), &test_settings("hello", 100).broadcast)
                .unwrap();

        let report = broadcaster.broadcast().await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].connection_id, "b");
        assert!(!report.truncated);

        // a is enumerated before b, c after it; both must be delivered
        assert_eq!(gateway.delivered_ids(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_mid_scan_failure_keeps_prior_deliveries() {
        let gateway = Arc::new(ScriptedGateway::new());
        let broadcaster = Broadcaster::new(
            Arc::new(TruncatingRegistry),
            gateway.clone(),
            &test_settings("hello", 2).broadcast,
        )
        .unwrap();

        let report = broadcaster.broadcast().await;

        // First page delivered before the scan fault; report says so
        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed(), 0);
        assert!(report.truncated);
        assert_eq!(gateway.delivered_ids(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_repeated_scan_entries_delivered_once() {
        let gateway = Arc::new(ScriptedGateway::new());
        let broadcaster = Broadcaster::new(
            Arc::new(RepeatingScanRegistry),
            gateway.clone(),
            &test_settings("hello", 2).broadcast,
        )
        .unwrap();

        let report = broadcaster.broadcast().await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 3);
        assert_eq!(gateway.delivered_ids(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_fanout_covers_multiple_scan_pages() {
        let registry = Arc::new(MemoryRegistry::new());
        for i in 0..25 {
            registry
                .put(&ConnectionRecord::new(format!("conn-{:02}", i)))
                .await
                .unwrap();
        }
        let gateway = Arc::new(ScriptedGateway::new());
        let broadcaster =
            Broadcaster::new(registry, gateway.clone(), &test_settings("hello", 10).broadcast)
                .unwrap();

        let report = broadcaster.broadcast().await;

        assert_eq!(report.attempted, 25);
        assert_eq!(report.delivered, 25);
        assert_eq!(gateway.delivered_ids().len(), 25);
    }

    #[tokio::test]
    async fn test_targeted_send_delivers_exactly_one_payload() {
        let gateway = Arc::new(ScriptedGateway::new());
        let state = test_state(Arc::new(MemoryRegistry::new()), gateway.clone());

        let response = api::send(State(state), Json(send_event("c7"))).await.unwrap();
        assert_eq!(response.0.status_code, 200);
        assert_eq!(gateway.delivered_ids(), vec!["c7"]);
    }

    #[tokio::test]
    async fn test_targeted_send_propagates_gateway_failure() {
        let gateway = Arc::new(ScriptedGateway::failing_for(&["gone"]));
        let state = test_state(Arc::new(MemoryRegistry::new()), gateway);

        let result = api::send(State(state), Json(send_event("gone"))).await;
        assert!(result.is_err());
    }
}

mod end_to_end {
    use super::*;

    #[tokio::test]
    async fn test_connect_then_broadcast_delivers_configured_payload() {
        let registry = Arc::new(MemoryRegistry::new());
        let gateway = Arc::new(ScriptedGateway::new());
        let state = AppState::with_backends(
            test_settings("response from relay backend ...", 100),
            registry.clone(),
            gateway.clone(),
        )
        .unwrap();

        assert_eq!(registry.count().await.unwrap(), 0);

        api::connect(State(state.clone()), Json(connect_event("c1")))
            .await
            .unwrap();
        assert_eq!(registry.count().await.unwrap(), 1);

        let response = api::broadcast(State(state)).await;
        assert_eq!(response.0.delivered, 1);

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "c1");
        // Payload is the JSON encoding of the configured response string
        assert_eq!(sent[0].1, b"\"response from relay backend ...\"");
    }

    #[tokio::test]
    async fn test_disconnect_removes_connection_from_fanout() {
        let registry = Arc::new(MemoryRegistry::new());
        let gateway = Arc::new(ScriptedGateway::new());
        let state = test_state(registry.clone(), gateway.clone());

        api::connect(State(state.clone()), Json(connect_event("c1")))
            .await
            .unwrap();
        api::connect(State(state.clone()), Json(connect_event("c2")))
            .await
            .unwrap();
        api::disconnect(State(state.clone()), Json(connect_event("c1")))
            .await
            .unwrap();

        let response = api::broadcast(State(state)).await;
        assert_eq!(response.0.delivered, 1);
        assert_eq!(gateway.delivered_ids(), vec!["c2"]);
    }

    #[tokio::test]
    async fn test_stats_reflect_activity() {
        let registry = Arc::new(MemoryRegistry::new());
        let gateway = Arc::new(ScriptedGateway::new());
        let state = test_state(registry, gateway);

        api::connect(State(state.clone()), Json(connect_event("c1")))
            .await
            .unwrap();
        api::broadcast(State(state.clone())).await;

        assert_eq!(state.registrar.stats().registered, 1);
        let broadcaster_stats = state.broadcaster.stats();
        assert_eq!(broadcaster_stats.broadcasts, 1);
        assert_eq!(broadcaster_stats.total_delivered, 1);
        assert_eq!(broadcaster_stats.total_failed, 0);
    }
}
