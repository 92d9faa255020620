//! Trigger endpoint handlers.
//!
//! Connect, disconnect, and broadcast report a fixed success status even
//! when the registry misbehaves; the fault is surfaced through structured
//! logs and the stats counters instead of the response. Targeted send is
//! the exception: a gateway failure fails the invocation.

use axum::{extract::State, Json};

use crate::error::{AppError, Result};
use crate::server::AppState;

use super::models::{BroadcastResponse, ConnectEvent, SendEvent, TriggerResponse};

/// Record a newly established connection.
#[tracing::instrument(
    name = "trigger.connect",
    skip(state, event),
    fields(connection_id = %event.request_context.connection_id)
)]
pub async fn connect(
    State(state): State<AppState>,
    Json(event): Json<ConnectEvent>,
) -> Result<Json<TriggerResponse>> {
    let connection_id = require_connection_id(&event.request_context.connection_id)?;

    // Never fail the connect handshake over a registry fault; the client
    // keeps its socket but may miss broadcasts until it reconnects.
    if let Err(e) = state.registrar.register(connection_id).await {
        tracing::warn!(
            connection_id = %connection_id,
            error = %e,
            "Registry write failed, accepting connection anyway"
        );
    }

    Ok(Json(TriggerResponse::ok()))
}

/// Remove a closed connection from the registry.
#[tracing::instrument(
    name = "trigger.disconnect",
    skip(state, event),
    fields(connection_id = %event.request_context.connection_id)
)]
pub async fn disconnect(
    State(state): State<AppState>,
    Json(event): Json<ConnectEvent>,
) -> Result<Json<TriggerResponse>> {
    let connection_id = require_connection_id(&event.request_context.connection_id)?;

    if let Err(e) = state.registrar.deregister(connection_id).await {
        tracing::warn!(
            connection_id = %connection_id,
            error = %e,
            "Registry delete failed, stale record may linger"
        );
    }

    Ok(Json(TriggerResponse::ok()))
}

/// Targeted mode: deliver the response payload to the sender's connection.
#[tracing::instrument(
    name = "trigger.send",
    skip(state, event),
    fields(connection_id = %event.request_context.connection_id)
)]
pub async fn send(
    State(state): State<AppState>,
    Json(event): Json<SendEvent>,
) -> Result<Json<TriggerResponse>> {
    let connection_id = require_connection_id(&event.request_context.connection_id)?;

    if event.request_context.domain_name.is_some() || event.request_context.stage.is_some() {
        tracing::debug!(
            domain_name = ?event.request_context.domain_name,
            stage = ?event.request_context.stage,
            "Event-supplied gateway endpoint ignored, using configured endpoint"
        );
    }

    state.broadcaster.send_to_connection(connection_id).await?;

    Ok(Json(TriggerResponse::ok()))
}

/// Broadcast mode: deliver the response payload to every registered
/// connection. The trigger body is accepted but its content is ignored.
#[tracing::instrument(name = "trigger.broadcast", skip(state))]
pub async fn broadcast(State(state): State<AppState>) -> Json<BroadcastResponse> {
    let report = state.broadcaster.broadcast().await;
    Json(BroadcastResponse::from(report))
}

fn require_connection_id(connection_id: &str) -> Result<&str> {
    if connection_id.is_empty() {
        return Err(AppError::Validation(
            "requestContext.connectionId must be non-empty".to_string(),
        ));
    }
    Ok(connection_id)
}
