use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::{BackupError, BlobStore};

/// Default backing tier: a plain directory, one file per key. Good enough
/// for single-box deployments and tests; `s3` is the feature-gated
/// alternative for anything that needs to survive the box dying.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, BackupError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| BackupError::Io(e.to_string()))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BackupError> {
        fs::write(self.path_for(key), bytes)
            .await
            .map_err(|e| BackupError::Io(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BackupError> {
        fs::read(self.path_for(key)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackupError::NotFound(key.to_string())
            } else {
                BackupError::Io(e.to_string())
            }
        })
    }
}
