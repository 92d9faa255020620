//! Redis-backed registry backend.
//!
//! One record per key under `{table_name}:conn:{connection_id}`, value is
//! the JSON-encoded [`ConnectionRecord`]. Enumeration uses SCAN cursors, so
//! a broadcast never truncates at a single page.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::config::RegistryConfig;

use super::{ConnectionRecord, ConnectionRegistry, RegistryError, ScanPage};

pub struct RedisRegistry {
    conn: ConnectionManager,
    table_name: String,
}

impl RedisRegistry {
    /// Connect to Redis and build a registry handle. The connection manager
    /// reconnects on its own, so one handle serves the process lifetime.
    pub async fn connect(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = client.get_connection_manager().await?;

        tracing::info!(
            table_name = %config.table_name,
            "Connected to Redis registry"
        );

        Ok(Self {
            conn,
            table_name: config.table_name.clone(),
        })
    }

    fn record_key(&self, connection_id: &str) -> String {
        format!("{}:conn:{}", self.table_name, connection_id)
    }

    fn key_pattern(&self) -> String {
        format!("{}:conn:*", self.table_name)
    }

    async fn scan_keys(
        &self,
        cursor: u64,
        limit: usize,
    ) -> Result<(u64, Vec<String>), RegistryError> {
        let mut conn = self.conn.clone();
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(self.key_pattern())
            .arg("COUNT")
            .arg(limit.max(1))
            .query_async(&mut conn)
            .await?;
        Ok((next, keys))
    }
}

#[async_trait]
impl ConnectionRegistry for RedisRegistry {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn put(&self, record: &ConnectionRecord) -> Result<(), RegistryError> {
        let json = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(self.record_key(&record.connection_id), json).await?;
        Ok(())
    }

    async fn delete(&self, connection_id: &str) -> Result<(), RegistryError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.record_key(connection_id)).await?;
        Ok(())
    }

    async fn scan(&self, cursor: Option<String>, limit: usize) -> Result<ScanPage, RegistryError> {
        let cursor: u64 = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| RegistryError::InvalidCursor(c.clone()))?,
            None => 0,
        };

        let (next, keys) = self.scan_keys(cursor, limit).await?;

        let mut records = Vec::with_capacity(keys.len());
        if !keys.is_empty() {
            let mut conn = self.conn.clone();
            let values: Vec<Option<String>> = conn.mget(&keys).await?;
            for value in values.into_iter().flatten() {
                match serde_json::from_str::<ConnectionRecord>(&value) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        // A malformed record should not poison the whole scan
                        tracing::warn!(error = %e, "Skipping malformed registry record");
                    }
                }
            }
        }

        // Redis signals scan exhaustion with cursor 0
        let next = if next != 0 {
            Some(next.to_string())
        } else {
            None
        };

        Ok(ScanPage { records, next })
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        // SCAN may repeat keys within one full iteration, so count distinct
        let mut seen = std::collections::HashSet::new();
        let mut cursor = 0u64;
        loop {
            let (next, keys) = self.scan_keys(cursor, 100).await?;
            seen.extend(keys);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(seen.len())
    }
}
