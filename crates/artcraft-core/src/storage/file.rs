//! File-based snapshot store.

use super::{BoxFuture, SnapshotRecord, SnapshotStore, StorageError, StorageResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File-based snapshot storage.
///
/// Each scope gets one JSON-lines file; every insert appends a record.
pub struct FileSnapshotStore {
    /// Base directory for snapshot files.
    base_path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create a store in the default location.
    ///
    /// On Unix: `~/.local/share/artcraft/snapshots/`
    /// On Windows: `%LOCALAPPDATA%\artcraft\snapshots\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("artcraft").join("snapshots"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn scope_path(&self, scope_id: &str) -> PathBuf {
        // Sanitize ID to be safe for filenames
        let safe_id: String = scope_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.jsonl", safe_id))
    }

    fn read_latest(&self, scope_id: &str) -> StorageResult<Option<SnapshotRecord>> {
        let path = self.scope_path(scope_id);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut latest: Option<SnapshotRecord> = None;
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<SnapshotRecord>(line) {
                // Sanitized names may collide; records carry their real scope.
                Ok(record) if record.scope_id == scope_id => {
                    if latest.as_ref().is_none_or(|l| record.updated_at >= l.updated_at) {
                        latest = Some(record);
                    }
                }
                Ok(_) => {}
                Err(e) => log::warn!("Skipping corrupt snapshot line in {}: {}", path.display(), e),
            }
        }
        Ok(latest)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn get_latest(&self, scope_id: &str) -> BoxFuture<'_, StorageResult<Option<SnapshotRecord>>> {
        let scope_id = scope_id.to_string();
        Box::pin(async move { self.read_latest(&scope_id) })
    }

    fn insert(&self, scope_id: &str, image_data: &str) -> BoxFuture<'_, StorageResult<SnapshotRecord>> {
        let scope_id = scope_id.to_string();
        let image_data = image_data.to_string();
        Box::pin(async move {
            let previous = self.read_latest(&scope_id)?.map(|r| r.updated_at);
            let record = SnapshotRecord::new(&scope_id, &image_data, previous);
            let line = serde_json::to_string(&record)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;

            let path = self.scope_path(&scope_id);
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| StorageError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
            writeln!(file, "{}", line).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
            })?;

            log::debug!("Stored snapshot {} for scope {}", record.id, scope_id);
            Ok(record)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_insert_and_read() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().to_path_buf()).unwrap();

        block_on(store.insert("community-42", "data:old")).unwrap();
        block_on(store.insert("community-42", "data:new")).unwrap();

        let latest = block_on(store.get_latest("community-42")).unwrap().unwrap();
        assert_eq!(latest.image_data, "data:new");
    }

    #[test]
    fn test_file_store_missing_scope() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().to_path_buf()).unwrap();
        assert!(block_on(store.get_latest("nothing-here")).unwrap().is_none());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FileSnapshotStore::new(dir.path().to_path_buf()).unwrap();
            block_on(store.insert("scope", "data:persisted")).unwrap();
        }
        let store = FileSnapshotStore::new(dir.path().to_path_buf()).unwrap();
        let latest = block_on(store.get_latest("scope")).unwrap().unwrap();
        assert_eq!(latest.image_data, "data:persisted");
    }

    #[test]
    fn test_file_store_colliding_names_stay_separate() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().to_path_buf()).unwrap();

        block_on(store.insert("a/b", "data:slash")).unwrap();
        block_on(store.insert("a_b", "data:underscore")).unwrap();

        let slash = block_on(store.get_latest("a/b")).unwrap().unwrap();
        assert_eq!(slash.image_data, "data:slash");
    }

    #[test]
    fn test_file_store_skips_corrupt_lines() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().to_path_buf()).unwrap();
        block_on(store.insert("scope", "data:good")).unwrap();
        let path = dir.path().join("scope.jsonl");
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        writeln!(file, "{{not json").unwrap();

        let latest = block_on(store.get_latest("scope")).unwrap().unwrap();
        assert_eq!(latest.image_data, "data:good");
    }
}
