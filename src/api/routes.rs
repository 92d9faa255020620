use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::handlers::{broadcast, connect, disconnect, send};
use super::health::{health, stats};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        // Connection lifecycle triggers
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        // Delivery triggers
        .route("/send", post(send))
        .route("/broadcast", post(broadcast))
}
