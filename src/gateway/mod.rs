//! Push gateway
//!
//! The gateway is the external service that owns the actual client sockets;
//! this system only asks it to deliver a payload to one connection
//! identifier. The [`PushGateway`] trait keeps delivery swappable for tests.

use async_trait::async_trait;
use thiserror::Error;

mod http;

pub use http::HttpPushGateway;

/// Error type for gateway deliveries
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The connection identifier no longer maps to an open socket
    #[error("connection {0} is gone")]
    Gone(String),

    #[error("gateway returned status {status} for connection {connection_id}")]
    Status { connection_id: String, status: u16 },

    #[error("gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Delivers a payload to a single open connection by identifier.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: &[u8],
    ) -> Result<(), GatewayError>;
}
