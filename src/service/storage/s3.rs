use std::collections::HashMap;

use crate::config::{StorageConfig, StorageType};
use crate::service::storage::classify::{classify, ErrorClass, Subject};
use crate::service::storage::types::{ObjectStream, StorageError, StorageResult};
use crate::service::storage::ObjectBackend;
use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::{
    config::{Credentials, Region},
    Client, Config,
};
use bytes::Bytes;
use cyder_tools::log::info;

/// Request signing needs a region even when the backend ignores it.
pub const DEFAULT_REGION: &str = "us-east-1";

pub fn resolve_region(region: &str) -> &str {
    if region.trim().is_empty() {
        DEFAULT_REGION
    } else {
        region
    }
}

/// `CreateBucket` must not carry a constraint for the default region.
pub fn location_constraint(region: &str) -> Option<&str> {
    if region.trim().is_empty() || region == DEFAULT_REGION {
        None
    } else {
        Some(region)
    }
}

/// Base URL for a custom host, or `None` to use the AWS endpoint resolver.
pub fn endpoint_url(config: &StorageConfig) -> Option<String> {
    if config.host.is_empty() {
        return None;
    }
    let scheme = if config.ssl { "https" } else { "http" };
    let host = config
        .host
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&config.host);
    let port = if config.port != 0 {
        format!(":{}", config.port)
    } else {
        String::new()
    };
    Some(format!("{}://{}{}", scheme, host, port))
}

/// Self-hosted backends (MinIO, localstack) don't serve virtual-host buckets.
pub fn use_path_style(config: &StorageConfig) -> bool {
    config.port != 0 || (!config.host.is_empty() && !config.host.contains("amazonaws.com"))
}

fn error_code<E: ProvideErrorMetadata>(err: &SdkError<E, HttpResponse>) -> Option<&str> {
    err.code().or_else(|| match err.raw_response() {
        Some(response) if response.status().as_u16() == 404 => Some("NotFound"),
        _ => None,
    })
}

fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, subject: Subject, target: String) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match classify(error_code(&err), subject) {
        ErrorClass::BucketNotFound => StorageError::BucketNotFound(target),
        ErrorClass::ObjectNotFound => StorageError::ObjectNotFound(target),
        ErrorClass::BucketAlreadyOwned => StorageError::BucketAlreadyOwned(target),
        ErrorClass::Other => StorageError::Connectivity(DisplayErrorContext(&err).to_string()),
    }
}

pub struct S3Backend {
    client: Client,
    storage_type: StorageType,
    location_constraint: Option<String>,
}

impl S3Backend {
    pub fn new(config: &StorageConfig) -> Self {
        let region = resolve_region(&config.region);
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "cdn-api",
        );
        let force_path_style = use_path_style(config);
        let mut s3_config_builder = Config::builder()
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(force_path_style)
            .behavior_version_latest();

        let endpoint = endpoint_url(config);
        if let Some(endpoint) = &endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint.as_str());
        }

        let client = Client::from_conf(s3_config_builder.build());
        info!(
            "{:?} storage initialized: endpoint={}, region={}, path_style={}",
            config.storage_type,
            endpoint.as_deref().unwrap_or("<aws default>"),
            region,
            force_path_style
        );
        Self {
            client,
            storage_type: config.storage_type.clone(),
            location_constraint: location_constraint(&config.region).map(str::to_string),
        }
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    fn storage_type(&self) -> StorageType {
        self.storage_type.clone()
    }

    async fn head_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_error(e, Subject::Bucket, bucket.to_string()))
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if let Some(region) = &self.location_constraint {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region.as_str()))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_error(e, Subject::Bucket, bucket.to_string()))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<()> {
        let metadata = if metadata.is_empty() {
            None
        } else {
            Some(metadata.clone())
        };

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(content))
            .set_metadata(metadata)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_error(e, Subject::Bucket, bucket.to_string()))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, Subject::Bucket, format!("{}/{}", bucket, key)))?;

        Ok(ObjectStream::new(output.body.into_async_read()))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_error(e, Subject::Object, format!("{}/{}", bucket, key)))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_error(e, Subject::Bucket, format!("{}/{}", bucket, key)))
    }
}
