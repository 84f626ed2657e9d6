use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use async_trait::async_trait;

use crate::{BackupError, BlobStore};

/// Object-storage-backed tier, enabled with `--features s3`. Keys are
/// stored under an optional prefix within a single bucket.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3BlobStore {
    pub async fn new(bucket: impl Into<String>, prefix: Option<String>) -> Self {
        let config = aws_config::load_from_env().await;
        let client = Client::new(&config);
        Self { client, bucket: bucket.into(), prefix }
    }

    fn object_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BackupError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| BackupError::Io(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BackupError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
            .map_err(|e| BackupError::Io(e.to_string()))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| BackupError::Io(e.to_string()))?
            .into_bytes();
        Ok(bytes.to_vec())
    }
}
