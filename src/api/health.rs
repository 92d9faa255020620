//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::broadcast::BroadcasterStatsSnapshot;
use crate::registrar::RegistrarStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub registry: RegistryHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct RegistryHealthResponse {
    pub backend: String,
    pub reachable: bool,
    pub connections: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub registrar: RegistrarStatsSnapshot,
    pub broadcaster: BroadcasterStatsSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (reachable, connections) = match state.registry.count().await {
        Ok(count) => (true, count),
        Err(e) => {
            tracing::warn!(error = %e, "Registry unreachable during health check");
            (false, 0)
        }
    };

    let status = if reachable { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        registry: RegistryHealthResponse {
            backend: state.registry.backend_name().to_string(),
            reachable,
            connections,
        },
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        registrar: state.registrar.stats(),
        broadcaster: state.broadcaster.stats(),
    })
}
