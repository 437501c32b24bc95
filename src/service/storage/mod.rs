use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{StorageConfig, StorageType};
use crate::service::storage::healing::HealingStorage;
use crate::service::storage::s3::S3Backend;
use crate::service::storage::types::{ObjectStream, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;

pub mod classify;
pub mod healing;
pub mod s3;
pub mod types;

/// Object store capability used by the rest of the server.
///
/// Every method rejects an empty bucket name or key before touching the
/// backend. Implementations decide how to recover from a missing bucket.
#[async_trait]
pub trait Storage: Send + Sync {
    fn get_storage_type(&self) -> StorageType;
    #[allow(dead_code)]
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()>;
    async fn check_connection(&self, bucket: &str) -> StorageResult<()>;
    /// `metadata` entries are `"name;value"` pairs; malformed entries are ignored.
    #[allow(dead_code)]
    async fn upload(
        &self,
        bucket: &str,
        content: Bytes,
        key: &str,
        metadata: &[String],
    ) -> StorageResult<()>;
    async fn download(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream>;
    #[allow(dead_code)]
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;
    #[allow(dead_code)]
    async fn is_exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;
}

/// Single-shot requests against one backend. Errors come back already
/// classified into bucket-missing / object-missing / connectivity.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    fn storage_type(&self) -> StorageType;
    async fn head_bucket(&self, bucket: &str) -> StorageResult<()>;
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()>;
    #[allow(dead_code)]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<()>;
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream>;
    #[allow(dead_code)]
    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<()>;
    #[allow(dead_code)]
    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;
}

pub fn new_storage(config: &StorageConfig) -> Arc<dyn Storage> {
    match config.storage_type {
        StorageType::S3 | StorageType::Minio => {
            Arc::new(HealingStorage::new(S3Backend::new(config)))
        }
    }
}
