//! Broadcast fan-out
//!
//! Delivers the configured response payload to one connection (targeted
//! mode) or to every registered connection (broadcast mode). Broadcast
//! enumeration is paginated through the registry scan cursor, deliveries
//! run one identifier at a time, and each attempt is isolated: one stale
//! connection cannot suppress delivery to the rest.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::config::BroadcastConfig;
use crate::gateway::{GatewayError, PushGateway};
use crate::registry::ConnectionRegistry;

/// Outcome of one failed delivery within a fan-out
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryFailure {
    pub connection_id: String,
    pub error: String,
}

/// Per-recipient result set for a single broadcast invocation
#[derive(Debug, Clone, Default, Serialize)]
pub struct FanoutReport {
    /// Deliveries attempted (recipients enumerated before any scan fault)
    pub attempted: usize,
    /// Deliveries accepted by the gateway
    pub delivered: usize,
    /// Per-recipient failures; never aborts the remaining fan-out
    pub failures: Vec<DeliveryFailure>,
    /// True if a scan fault stopped enumeration before exhaustion
    pub truncated: bool,
}

impl FanoutReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Counters for the broadcaster
#[derive(Debug, Default)]
pub struct BroadcasterStats {
    pub broadcasts: AtomicU64,
    pub targeted_sends: AtomicU64,
    pub total_delivered: AtomicU64,
    pub total_failed: AtomicU64,
}

impl BroadcasterStats {
    pub fn snapshot(&self) -> BroadcasterStatsSnapshot {
        BroadcasterStatsSnapshot {
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            targeted_sends: self.targeted_sends.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcasterStatsSnapshot {
    pub broadcasts: u64,
    pub targeted_sends: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
}

pub struct Broadcaster {
    registry: Arc<dyn ConnectionRegistry>,
    gateway: Arc<dyn PushGateway>,
    /// JSON encoding of the configured response string, shared by every
    /// recipient of every invocation
    payload: Vec<u8>,
    scan_page_size: usize,
    stats: BroadcasterStats,
}

impl Broadcaster {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        gateway: Arc<dyn PushGateway>,
        config: &BroadcastConfig,
    ) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(&config.response_message)?;
        Ok(Self {
            registry,
            gateway,
            payload,
            scan_page_size: config.scan_page_size.max(1),
            stats: BroadcasterStats::default(),
        })
    }

    pub fn stats(&self) -> BroadcasterStatsSnapshot {
        self.stats.snapshot()
    }

    /// Deliver the response payload to a single connection. A gateway
    /// failure propagates to the caller; the targeted contract fails the
    /// invocation on a stale or unreachable identifier.
    #[tracing::instrument(name = "broadcaster.send_to_connection", skip(self))]
    pub async fn send_to_connection(&self, connection_id: &str) -> Result<(), GatewayError> {
        self.stats.targeted_sends.fetch_add(1, Ordering::Relaxed);

        match self
            .gateway
            .post_to_connection(connection_id, &self.payload)
            .await
        {
            Ok(()) => {
                self.stats.total_delivered.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(connection_id = %connection_id, "Delivered targeted payload");
                Ok(())
            }
            Err(e) => {
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Deliver the response payload to every registered connection.
    ///
    /// Never fails: a scan fault degrades to an empty (or truncated)
    /// recipient set, and per-recipient gateway failures are collected into
    /// the report instead of aborting the loop. Identifiers repeated across
    /// scan pages are delivered once.
    #[tracing::instrument(name = "broadcaster.broadcast", skip(self))]
    pub async fn broadcast(&self) -> FanoutReport {
        let mut report = FanoutReport::default();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let page = match self.registry.scan(cursor.take(), self.scan_page_size).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempted = report.attempted,
                        "Registry scan failed, stopping fan-out enumeration"
                    );
                    report.truncated = true;
                    break;
                }
            };

            for record in page.records {
                // Scan pagination may repeat an identifier across pages
                if !seen.insert(record.connection_id.clone()) {
                    continue;
                }
                report.attempted += 1;
                match self
                    .gateway
                    .post_to_connection(&record.connection_id, &self.payload)
                    .await
                {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        tracing::warn!(
                            connection_id = %record.connection_id,
                            error = %e,
                            "Delivery failed, continuing fan-out"
                        );
                        report.failures.push(DeliveryFailure {
                            connection_id: record.connection_id,
                            error: e.to_string(),
                        });
                    }
                }
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        self.stats.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.stats
            .total_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.stats
            .total_failed
            .fetch_add(report.failed() as u64, Ordering::Relaxed);

        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed(),
            truncated = report.truncated,
            "Broadcast complete"
        );

        report
    }
}
