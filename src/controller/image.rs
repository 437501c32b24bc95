use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::Response,
    routing::get,
};
use cyder_tools::log::warn;
use tokio_util::io::ReaderStream;

use crate::service::app_state::{create_state_router, AppState, StateRouter};
use crate::utils::sniff::DEFAULT_CONTENT_TYPE;

use super::BaseError;

const IMAGE_NOT_FOUND: &str = "Image not found or error retrieving it";

fn image_id_required() -> BaseError {
    BaseError::ParamInvalid(Some("image_id is required".to_string()))
}

async fn missing_image_id() -> BaseError {
    image_id_required()
}

/// Streams the object named by `image_id`. Every storage failure is reported
/// as not found.
async fn get_image(
    State(app_state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
) -> Result<Response, BaseError> {
    if image_id.is_empty() {
        return Err(image_id_required());
    }

    let (stream, content_type) = app_state.images.get_image(&image_id).await.map_err(|e| {
        warn!("failed to retrieve image {}: {}", image_id, e);
        BaseError::NotFound(Some(IMAGE_NOT_FOUND.to_string()))
    })?;

    let content_type = if content_type.is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        content_type
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_DISPOSITION, "inline")
        .body(Body::from_stream(ReaderStream::new(stream)))
        .map_err(|e| BaseError::InternalServerError(Some(e.to_string())))
}

pub fn create_image_router() -> StateRouter {
    create_state_router()
        .route("/images", get(missing_image_id))
        .route("/images/", get(missing_image_id))
        .route("/images/{image_id}", get(get_image))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use axum::{body::to_bytes, http::Request};
    use bytes::Bytes;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::StorageType;
    use crate::controller::create_app;
    use crate::service::storage::types::{ObjectStream, StorageError, StorageResult};
    use crate::service::storage::Storage;

    use super::*;

    const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00\x01\x01\x00\x00\x01\x00\x01\x00\x00";

    /// Serves fixed objects from the `images` bucket.
    struct FixedStorage {
        objects: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl Storage for FixedStorage {
        fn get_storage_type(&self) -> StorageType {
            StorageType::S3
        }

        async fn create_bucket(&self, _bucket: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn check_connection(&self, _bucket: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn upload(
            &self,
            _bucket: &str,
            _content: Bytes,
            _key: &str,
            _metadata: &[String],
        ) -> StorageResult<()> {
            Err(StorageError::Connectivity("read only".to_string()))
        }

        async fn download(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
            if bucket != "images" {
                return Err(StorageError::BucketNotFound(bucket.to_string()));
            }
            self.objects
                .get(key)
                .map(|data| ObjectStream::new(std::io::Cursor::new(data.clone())))
                .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))
        }

        async fn delete(&self, _bucket: &str, _key: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn is_exists(&self, _bucket: &str, key: &str) -> StorageResult<bool> {
            Ok(self.objects.contains_key(key))
        }
    }

    fn app_with(bucket: &str) -> axum::Router {
        let objects = HashMap::from([
            ("photo.jpg".to_string(), JPEG.to_vec()),
            ("empty".to_string(), Vec::new()),
        ]);
        let storage: Arc<dyn Storage> = Arc::new(FixedStorage { objects });
        create_app(Arc::new(AppState::new(storage, bucket.to_string())))
    }

    async fn send(app: axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Bytes) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    fn error_message(body: &Bytes) -> String {
        let value: Value = serde_json::from_slice(body).unwrap();
        value["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_empty_image_id_is_bad_request() {
        for uri in ["/images/", "/images"] {
            let (status, _, body) = send(app_with("images"), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(error_message(&body), "image_id is required");
        }
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let (status, _, body) = send(app_with("images"), "/images/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_message(&body), IMAGE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_bucket_is_not_found() {
        let (status, _, body) = send(app_with("other"), "/images/photo.jpg").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_message(&body), IMAGE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_jpeg_is_streamed_with_detected_type() {
        let (status, headers, body) = send(app_with("images"), "/images/photo.jpg").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], "image/jpeg");
        assert_eq!(headers[CONTENT_DISPOSITION], "inline");
        assert_eq!(&body[..], JPEG);
    }

    #[tokio::test]
    async fn test_empty_object_gets_default_type() {
        let (status, headers, body) = send(app_with("images"), "/images/empty").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], DEFAULT_CONTENT_TYPE);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_health_and_unknown_routes() {
        let (status, _, body) = send(app_with("images"), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "ok" }));

        let (status, _, _) = send(app_with("images"), "/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
