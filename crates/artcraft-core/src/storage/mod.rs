//! Snapshot persistence.
//!
//! A snapshot store keeps, per scope, an append-only list of full-surface
//! snapshots. Reads return the most recent one; there is no versioning or
//! conflict detection, so the last insert wins.

mod autosave;
mod file;
mod memory;

pub use autosave::{AutoSave, DEFAULT_AUTOSAVE_INTERVAL_SECS};
pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Key under which a single-user session keeps its local artwork.
pub const LOCAL_ARTWORK_KEY: &str = "artcraft_canvas";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Snapshot not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Not authorized to write scope {0}")]
    Unauthorized(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async store operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One persisted snapshot of a scope's canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: Uuid,
    pub scope_id: String,
    /// `data:image/png;base64,...` URL of the surface.
    pub image_data: String,
    /// Milliseconds since the Unix epoch.
    pub updated_at: u64,
}

impl SnapshotRecord {
    /// Create a record stamped no earlier than `after`, so that per-scope
    /// timestamps stay strictly increasing even when the clock stalls.
    pub fn new(scope_id: &str, image_data: &str, after: Option<u64>) -> Self {
        let now = now_millis();
        let updated_at = match after {
            Some(prev) if prev >= now => prev + 1,
            _ => now,
        };
        Self {
            id: Uuid::new_v4(),
            scope_id: scope_id.to_string(),
            image_data: image_data.to_string(),
            updated_at,
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Trait for snapshot storage backends.
///
/// Implementations can keep snapshots in memory, on disk, or behind the
/// relay server.
pub trait SnapshotStore: Send + Sync {
    /// The most recently inserted record for a scope, if any.
    fn get_latest(&self, scope_id: &str) -> BoxFuture<'_, StorageResult<Option<SnapshotRecord>>>;

    /// Insert a new record for a scope. Older records are kept but shadowed.
    fn insert(&self, scope_id: &str, image_data: &str) -> BoxFuture<'_, StorageResult<SnapshotRecord>>;
}
