use std::sync::Arc;

use crate::service::resolver::sniff_stream;
use crate::service::storage::types::{ObjectStream, StorageResult};
use crate::service::storage::Storage;

/// Serves images out of a single bucket; the image id is the object key.
#[derive(Clone)]
pub struct ImageService {
    storage: Arc<dyn Storage>,
    bucket: String,
}

impl ImageService {
    pub fn new(storage: Arc<dyn Storage>, bucket: String) -> Self {
        Self { storage, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Opens the object and sniffs its media type. The returned type is
    /// empty for an empty object.
    pub async fn get_image(&self, image_id: &str) -> StorageResult<(ObjectStream, String)> {
        let stream = self.storage.download(&self.bucket, image_id).await?;
        sniff_stream(stream).await
    }
}
