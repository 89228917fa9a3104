//! Durable artifact storage with signed-URL retrieval.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::runtime_context::TimeProvider;

/// Validity window for signed URLs.
pub const SIGNED_URL_TTL_SECS: i64 = 7 * 24 * 3600;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Retrieval URL for an uploaded artifact, valid until `expires_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: i64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, instance_id: &str, bytes: &[u8]) -> Result<SignedUrl, BlobError>;
    async fn fetch(&self, instance_id: &str) -> Result<Option<Vec<u8>>, BlobError>;
}

/// In-memory store. URLs are prefixed with the configured storage prefix so
/// callers can verify where an artifact would live.
pub struct MemoryBlobStore {
    prefix: String,
    time_provider: Arc<dyn TimeProvider>,
    objects: tokio::sync::RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new(prefix: impl Into<String>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            prefix: prefix.into(),
            time_provider,
            objects: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, instance_id: &str, bytes: &[u8]) -> Result<SignedUrl, BlobError> {
        self.objects
            .write()
            .await
            .insert(instance_id.to_string(), bytes.to_vec());
        Ok(SignedUrl {
            url: format!("{}/{}/quote.html", self.prefix.trim_end_matches('/'), instance_id),
            expires_at: self.time_provider.now_timestamp() + SIGNED_URL_TTL_SECS,
        })
    }

    async fn fetch(&self, instance_id: &str) -> Result<Option<Vec<u8>>, BlobError> {
        Ok(self.objects.read().await.get(instance_id).cloned())
    }
}

/// Writes each artifact under a directory and hands back a `file://` URL.
pub struct FileBlobStore {
    dir: PathBuf,
    time_provider: Arc<dyn TimeProvider>,
}

impl FileBlobStore {
    pub fn new(
        dir: impl AsRef<Path>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Result<Self, BlobError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| BlobError::StorageError(e.to_string()))?;
        Ok(Self { dir, time_provider })
    }

    fn path_for(&self, instance_id: &str) -> PathBuf {
        self.dir.join(format!("{}.quote.html", instance_id))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn upload(&self, instance_id: &str, bytes: &[u8]) -> Result<SignedUrl, BlobError> {
        let path = self.path_for(instance_id);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| BlobError::UploadFailed(e.to_string()))?;
        Ok(SignedUrl {
            url: format!("file://{}", path.display()),
            expires_at: self.time_provider.now_timestamp() + SIGNED_URL_TTL_SECS,
        })
    }

    async fn fetch(&self, instance_id: &str) -> Result<Option<Vec<u8>>, BlobError> {
        match tokio::fs::read(self.path_for(instance_id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BlobError::StorageError(e.to_string())),
        }
    }
}
