//! In-memory snapshot store.

use super::{BoxFuture, SnapshotRecord, SnapshotStore, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for tests and ephemeral servers.
#[derive(Default)]
pub struct MemorySnapshotStore {
    records: RwLock<HashMap<String, Vec<SnapshotRecord>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records ever inserted for a scope.
    pub fn record_count(&self, scope_id: &str) -> usize {
        self.records
            .read()
            .map(|records| records.get(scope_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get_latest(&self, scope_id: &str) -> BoxFuture<'_, StorageResult<Option<SnapshotRecord>>> {
        let scope_id = scope_id.to_string();
        Box::pin(async move {
            let records = self
                .records
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            Ok(records.get(&scope_id).and_then(|rows| rows.last()).cloned())
        })
    }

    fn insert(&self, scope_id: &str, image_data: &str) -> BoxFuture<'_, StorageResult<SnapshotRecord>> {
        let scope_id = scope_id.to_string();
        let image_data = image_data.to_string();
        Box::pin(async move {
            let mut records = self
                .records
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            let rows = records.entry(scope_id.clone()).or_default();
            let record = SnapshotRecord::new(
                &scope_id,
                &image_data,
                rows.last().map(|r| r.updated_at),
            );
            rows.push(record.clone());
            Ok(record)
        })
    }
}
