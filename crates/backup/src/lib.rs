//! Cold-tier backup (§4.10): a fire-and-forget blob PUT per committed WAL
//! record, abstracted behind `BlobStore` so the engine never cares whether
//! the backing tier is a local directory or object storage, grounded on
//! `remote_storage`'s generic-storage trait scoped down to PUT/GET.

pub mod fs_store;
#[cfg(feature = "s3")]
pub mod s3_store;

use async_trait::async_trait;
use sk_common::Lsn;

pub use fs_store::FsBlobStore;
#[cfg(feature = "s3")]
pub use s3_store::S3BlobStore;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("blob store I/O error: {0}")]
    Io(String),
    #[error("blob not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BackupError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, BackupError>;
}

pub fn blob_key(lsn: Lsn) -> String {
    format!("wal_{lsn:020}")
}
