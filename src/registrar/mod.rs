//! Connection registrar
//!
//! Records newly established connections in the registry and removes them
//! again on disconnect. Write failures are returned to the caller as a
//! `Result` so the trigger layer can log them; the connect handshake itself
//! is never failed over a registry fault.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::registry::{ConnectionRecord, ConnectionRegistry, RegistryError};

/// Counters for the registrar
#[derive(Debug, Default)]
pub struct RegistrarStats {
    pub registered: AtomicU64,
    pub deregistered: AtomicU64,
    pub failed_writes: AtomicU64,
}

impl RegistrarStats {
    pub fn snapshot(&self) -> RegistrarStatsSnapshot {
        RegistrarStatsSnapshot {
            registered: self.registered.load(Ordering::Relaxed),
            deregistered: self.deregistered.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrarStatsSnapshot {
    pub registered: u64,
    pub deregistered: u64,
    pub failed_writes: u64,
}

pub struct ConnectionRegistrar {
    registry: Arc<dyn ConnectionRegistry>,
    stats: RegistrarStats,
}

impl ConnectionRegistrar {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            registry,
            stats: RegistrarStats::default(),
        }
    }

    pub fn stats(&self) -> RegistrarStatsSnapshot {
        self.stats.snapshot()
    }

    /// Upsert a connection record for the given identifier. Registering the
    /// same identifier twice leaves exactly one record.
    #[tracing::instrument(name = "registrar.register", skip(self))]
    pub async fn register(&self, connection_id: &str) -> Result<(), RegistryError> {
        let record = ConnectionRecord::new(connection_id);
        match self.registry.put(&record).await {
            Ok(()) => {
                self.stats.registered.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(connection_id = %connection_id, "Connection registered");
                Ok(())
            }
            Err(e) => {
                self.stats.failed_writes.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Remove the record for the given identifier, if any.
    #[tracing::instrument(name = "registrar.deregister", skip(self))]
    pub async fn deregister(&self, connection_id: &str) -> Result<(), RegistryError> {
        match self.registry.delete(connection_id).await {
            Ok(()) => {
                self.stats.deregistered.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(connection_id = %connection_id, "Connection deregistered");
                Ok(())
            }
            Err(e) => {
                self.stats.failed_writes.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}
