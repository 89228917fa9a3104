//! Durable checkpoint persistence with optimistic concurrency.
//!
//! Saves are atomic per instance and must carry `stored_version + 1` (first
//! save carries 1). A save that loses the version race returns
//! [`CheckpointError::VersionConflict`] instead of silently dropping a write;
//! the checkpoint store is the only synchronization point between concurrent
//! resumptions of the same instance.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::types::CheckpointRecord;

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Checkpoint not found for instance: {0}")]
    NotFound(String),
    #[error("Checkpoint corrupted: {0}")]
    Corrupted(String),
    #[error("Version conflict for instance '{instance_id}': expected {expected}, got {got}")]
    VersionConflict {
        instance_id: String,
        expected: u64,
        got: u64,
    },
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a checkpoint. Rejects any record whose version is not exactly
    /// one greater than the currently stored version.
    async fn save(&self, record: &CheckpointRecord) -> Result<(), CheckpointError>;
    async fn load(&self, instance_id: &str) -> Result<Option<CheckpointRecord>, CheckpointError>;
    /// Explicit archival. Removing a missing instance is not an error.
    async fn delete(&self, instance_id: &str) -> Result<(), CheckpointError>;
}

fn expected_version(current: Option<u64>) -> u64 {
    current.map(|v| v + 1).unwrap_or(1)
}

#[derive(Default)]
pub struct MemoryCheckpointStore {
    data: tokio::sync::RwLock<HashMap<String, CheckpointRecord>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, record: &CheckpointRecord) -> Result<(), CheckpointError> {
        let mut data = self.data.write().await;
        let expected = expected_version(data.get(&record.instance_id).map(|r| r.version));
        if record.version != expected {
            return Err(CheckpointError::VersionConflict {
                instance_id: record.instance_id.clone(),
                expected,
                got: record.version,
            });
        }
        data.insert(record.instance_id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, instance_id: &str) -> Result<Option<CheckpointRecord>, CheckpointError> {
        Ok(self.data.read().await.get(instance_id).cloned())
    }

    async fn delete(&self, instance_id: &str) -> Result<(), CheckpointError> {
        self.data.write().await.remove(instance_id);
        Ok(())
    }
}

/// One JSON file per instance. Writes go through a temp file and rename so a
/// crashed save never leaves a half-written checkpoint, and a store-wide
/// mutex serializes the read-check-write cycle.
pub struct FileCheckpointStore {
    dir: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileCheckpointStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| CheckpointError::StorageError(e.to_string()))?;
        Ok(Self {
            dir,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn path_for(&self, instance_id: &str) -> PathBuf {
        self.dir.join(format!("{}.checkpoint.json", instance_id))
    }

    async fn read_record(
        &self,
        instance_id: &str,
    ) -> Result<Option<CheckpointRecord>, CheckpointError> {
        let path = self.path_for(instance_id);
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CheckpointError::StorageError(e.to_string())),
        };
        let record = serde_json::from_slice::<CheckpointRecord>(&bytes)
            .map_err(|e| CheckpointError::Corrupted(e.to_string()))?;
        Ok(Some(record))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, record: &CheckpointRecord) -> Result<(), CheckpointError> {
        let _guard = self.write_lock.lock().await;

        let current = self.read_record(&record.instance_id).await?;
        let expected = expected_version(current.map(|r| r.version));
        if record.version != expected {
            return Err(CheckpointError::VersionConflict {
                instance_id: record.instance_id.clone(),
                expected,
                got: record.version,
            });
        }

        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| CheckpointError::SerializationError(e.to_string()))?;
        let path = self.path_for(&record.instance_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| CheckpointError::StorageError(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| CheckpointError::StorageError(e.to_string()))
    }

    async fn load(&self, instance_id: &str) -> Result<Option<CheckpointRecord>, CheckpointError> {
        self.read_record(instance_id).await
    }

    async fn delete(&self, instance_id: &str) -> Result<(), CheckpointError> {
        let path = self.path_for(instance_id);
        let _ = tokio::fs::remove_file(path).await;
        Ok(())
    }
}
