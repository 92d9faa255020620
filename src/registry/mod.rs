//! Connection registry
//!
//! Durable mapping from connection identifier to connection record. The
//! registry is shared mutable state external to all handlers; backends are
//! swappable behind the [`ConnectionRegistry`] trait (Redis in production,
//! in-memory for local runs and tests).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RegistryConfig;

mod memory;
mod redis_store;

pub use memory::MemoryRegistry;
pub use redis_store::RedisRegistry;

/// A single registered connection. At most one record exists per
/// `connection_id` at any time; re-registering overwrites (last write wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Opaque identifier assigned by the transport layer
    pub connection_id: String,
    /// When the record was (last) written
    pub registered_at: DateTime<Utc>,
}

impl ConnectionRecord {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            registered_at: Utc::now(),
        }
    }
}

/// One page of a registry enumeration. `next` is an opaque continuation
/// cursor; `None` means the scan is exhausted.
#[derive(Debug, Clone)]
pub struct ScanPage {
    pub records: Vec<ConnectionRecord>,
    pub next: Option<String>,
}

/// Error type for registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid scan cursor: {0}")]
    InvalidCursor(String),

    #[error("Registry error: {0}")]
    Other(String),
}

/// Durable connection-identifier store.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Human-readable backend name for health reporting
    fn backend_name(&self) -> &'static str;

    /// Upsert a connection record (last write wins)
    async fn put(&self, record: &ConnectionRecord) -> Result<(), RegistryError>;

    /// Remove a connection record; removing an unknown identifier is a no-op
    async fn delete(&self, connection_id: &str) -> Result<(), RegistryError>;

    /// Enumerate one page of records starting at `cursor` (`None` starts a
    /// fresh scan). `limit` is a hint for the page size; backends may return
    /// fewer or slightly more records per page. A full iteration may yield
    /// the same record on more than one page (Redis SCAN semantics), so
    /// callers needing exactly-once handling must deduplicate by
    /// `connection_id`.
    async fn scan(&self, cursor: Option<String>, limit: usize) -> Result<ScanPage, RegistryError>;

    /// Number of currently registered connections
    async fn count(&self) -> Result<usize, RegistryError>;
}

/// Create a registry backend based on configuration.
pub async fn create_registry(
    config: &RegistryConfig,
) -> Result<Arc<dyn ConnectionRegistry>, RegistryError> {
    match config.backend.as_str() {
        "redis" => {
            tracing::info!(
                url = %config.url,
                table_name = %config.table_name,
                "Creating Redis connection registry"
            );
            Ok(Arc::new(RedisRegistry::connect(config).await?))
        }
        "memory" => {
            tracing::info!("Creating in-memory connection registry");
            Ok(Arc::new(MemoryRegistry::new()))
        }
        other => {
            tracing::warn!(
                backend = %other,
                "Unknown registry backend, falling back to in-memory"
            );
            Ok(Arc::new(MemoryRegistry::new()))
        }
    }
}
