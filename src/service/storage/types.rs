use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("bucket name is required")]
    BucketNameRequired,
    #[error("key is required")]
    KeyRequired,
    #[error("bucket not found: {0}")]
    BucketNotFound(String),
    #[error("object not found: {0}")]
    ObjectNotFound(String),
    #[error("bucket already owned by you: {0}")]
    BucketAlreadyOwned(String),
    #[error("storage backend error: {0}")]
    Connectivity(String),
    #[error("failed to read object stream: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_bucket_not_found(&self) -> bool {
        matches!(self, StorageError::BucketNotFound(_))
    }

    #[allow(dead_code)]
    pub fn is_object_not_found(&self) -> bool {
        matches!(self, StorageError::ObjectNotFound(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

pub fn require_bucket(bucket: &str) -> StorageResult<()> {
    if bucket.is_empty() {
        return Err(StorageError::BucketNameRequired);
    }
    Ok(())
}

pub fn require_bucket_and_key(bucket: &str, key: &str) -> StorageResult<()> {
    require_bucket(bucket)?;
    if key.is_empty() {
        return Err(StorageError::KeyRequired);
    }
    Ok(())
}

/// Builds user metadata from `"name;value"` entries. Entries that do not
/// split into exactly two parts are skipped; later names overwrite earlier ones.
#[allow(dead_code)]
pub fn parse_metadata<S: AsRef<str>>(entries: &[S]) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    for entry in entries {
        let parts: Vec<&str> = entry.as_ref().split(';').collect();
        if let [name, value] = parts.as_slice() {
            metadata.insert(name.to_string(), value.to_string());
        }
    }
    metadata
}

/// Body of a downloaded object.
///
/// Owns the underlying connection; dropping the stream releases it.
pub struct ObjectStream {
    inner: Pin<Box<dyn AsyncRead + Send>>,
}

impl ObjectStream {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self {
            inner: Box::pin(reader),
        }
    }
}

impl AsyncRead for ObjectStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.get_mut().inner.as_mut().poll_read(cx, buf)
    }
}

impl fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_parse_metadata_skips_malformed_entries() {
        let entries = vec![
            "author;alice",
            "no-separator",
            "too;many;parts",
            "source;camera",
            ";",
        ];
        let metadata = parse_metadata(&entries);

        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata.get("author").map(String::as_str), Some("alice"));
        assert_eq!(metadata.get("source").map(String::as_str), Some("camera"));
        assert_eq!(metadata.get("").map(String::as_str), Some(""));
    }

    #[test]
    fn test_parse_metadata_later_entries_win() {
        let metadata = parse_metadata(&["k;first", "k;second"]);
        assert_eq!(metadata.get("k").map(String::as_str), Some("second"));
    }

    #[test]
    fn test_required_checks() {
        assert!(matches!(
            require_bucket_and_key("", "key"),
            Err(StorageError::BucketNameRequired)
        ));
        assert!(matches!(
            require_bucket_and_key("bucket", ""),
            Err(StorageError::KeyRequired)
        ));
        assert!(require_bucket_and_key("bucket", "key").is_ok());
    }

    #[tokio::test]
    async fn test_object_stream_reads_through() {
        let mut stream = ObjectStream::new(&b"hello"[..]);
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
    }
}
