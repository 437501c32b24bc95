use crate::config::StorageType;
use crate::service::storage::types::{
    parse_metadata, require_bucket, require_bucket_and_key, ObjectStream, StorageError,
    StorageResult,
};
use crate::service::storage::{ObjectBackend, Storage};
use async_trait::async_trait;
use bytes::Bytes;
use cyder_tools::log::{debug, info, warn};

/// Wraps a backend so that an operation failing with "bucket not found"
/// creates the bucket and is retried exactly once.
pub struct HealingStorage<B> {
    backend: B,
}

impl<B: ObjectBackend> HealingStorage<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Probes the bucket and creates it if the backend reports it missing.
    pub async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        require_bucket(bucket)?;
        match self.backend.head_bucket(bucket).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_bucket_not_found() => {
                info!("bucket {} does not exist, creating it", bucket);
                match self.backend.create_bucket(bucket).await {
                    // A concurrent repair created it first.
                    Err(StorageError::BucketAlreadyOwned(_)) => Ok(()),
                    result => result,
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn repair(&self, bucket: &str) -> bool {
        match self.ensure_bucket(bucket).await {
            Ok(()) => true,
            Err(e) => {
                warn!("failed to repair missing bucket {}: {}", bucket, e);
                false
            }
        }
    }
}

#[async_trait]
impl<B: ObjectBackend> Storage for HealingStorage<B> {
    fn get_storage_type(&self) -> StorageType {
        self.backend.storage_type()
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        require_bucket(bucket)?;
        self.backend.create_bucket(bucket).await
    }

    async fn check_connection(&self, bucket: &str) -> StorageResult<()> {
        require_bucket(bucket)?;
        self.backend.head_bucket(bucket).await
    }

    async fn upload(
        &self,
        bucket: &str,
        content: Bytes,
        key: &str,
        metadata: &[String],
    ) -> StorageResult<()> {
        require_bucket_and_key(bucket, key)?;
        let metadata = parse_metadata(metadata);

        match self
            .backend
            .put_object(bucket, key, content.clone(), &metadata)
            .await
        {
            Err(err) if err.is_bucket_not_found() => {
                if !self.repair(bucket).await {
                    return Err(err);
                }
                self.backend.put_object(bucket, key, content, &metadata).await
            }
            result => result,
        }
    }

    async fn download(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        require_bucket_and_key(bucket, key)?;

        match self.backend.get_object(bucket, key).await {
            Err(err) if err.is_bucket_not_found() => {
                if !self.repair(bucket).await {
                    return Err(err);
                }
                self.backend.get_object(bucket, key).await
            }
            result => result,
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        require_bucket_and_key(bucket, key)?;

        match self.backend.delete_object(bucket, key).await {
            Err(err) if err.is_bucket_not_found() => {
                // The retry is best effort; the caller still sees the original error.
                if self.repair(bucket).await {
                    if let Err(retry_err) = self.backend.delete_object(bucket, key).await {
                        debug!("retried delete of {}/{} failed: {}", bucket, key, retry_err);
                    }
                }
                Err(err)
            }
            result => result,
        }
    }

    async fn is_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        require_bucket_and_key(bucket, key)?;

        match self.backend.head_object(bucket, key).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_object_not_found() => Ok(false),
            Err(err) if err.is_bucket_not_found() => {
                if !self.repair(bucket).await {
                    return Err(err);
                }
                match self.backend.head_object(bucket, key).await {
                    Ok(()) => Ok(true),
                    Err(retry_err) if retry_err.is_object_not_found() => Ok(false),
                    Err(retry_err) => Err(retry_err),
                }
            }
            Err(err) => Err(err),
        }
    }
}
