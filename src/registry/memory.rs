//! In-memory registry backend for local runs and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ConnectionRecord, ConnectionRegistry, RegistryError, ScanPage};

/// DashMap-backed registry. Scans enumerate identifiers in lexicographic
/// order so pagination is stable across pages within a quiescent registry.
#[derive(Default)]
pub struct MemoryRegistry {
    records: DashMap<String, ConnectionRecord>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for MemoryRegistry {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, record: &ConnectionRecord) -> Result<(), RegistryError> {
        self.records
            .insert(record.connection_id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, connection_id: &str) -> Result<(), RegistryError> {
        self.records.remove(connection_id);
        Ok(())
    }

    async fn scan(&self, cursor: Option<String>, limit: usize) -> Result<ScanPage, RegistryError> {
        let offset: usize = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| RegistryError::InvalidCursor(c.clone()))?,
            None => 0,
        };

        let mut ids: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        ids.sort();

        let end = (offset + limit.max(1)).min(ids.len());
        let records = ids[offset.min(ids.len())..end]
            .iter()
            .filter_map(|id| self.records.get(id).map(|e| e.value().clone()))
            .collect();

        let next = if end < ids.len() {
            Some(end.to_string())
        } else {
            None
        };

        Ok(ScanPage { records, next })
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        Ok(self.records.len())
    }
}
