use std::io::{Cursor, ErrorKind};

use cyder_tools::log::warn;
use tokio::io::AsyncReadExt;

use crate::service::storage::types::{ObjectStream, StorageResult};
use crate::utils::sniff::{detect_content_type, SNIFF_LEN};

/// Reads up to [`SNIFF_LEN`] bytes to detect the media type, then returns a
/// stream that replays those bytes ahead of the rest of the original body.
///
/// The detected type is empty when the object is empty. On a read error the
/// original stream is dropped, which releases its connection.
pub async fn sniff_stream(mut stream: ObjectStream) -> StorageResult<(ObjectStream, String)> {
    let mut prefix = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        match stream.read(&mut prefix[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("failed to read object prefix for sniffing: {}", e);
                return Err(e.into());
            }
        }
    }
    prefix.truncate(filled);

    let content_type = if prefix.is_empty() {
        String::new()
    } else {
        detect_content_type(&prefix).to_string()
    };

    Ok((ObjectStream::new(Cursor::new(prefix).chain(stream)), content_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::storage::types::StorageError;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    /// Hands out at most `chunk` bytes per read, optionally failing once the
    /// data runs out, and counts how often it is dropped.
    struct TrickleReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
        fail_at_end: bool,
        drops: Arc<AtomicUsize>,
    }

    impl TrickleReader {
        fn new(data: Vec<u8>, chunk: usize, drops: Arc<AtomicUsize>) -> Self {
            Self {
                data,
                pos: 0,
                chunk,
                fail_at_end: false,
                drops,
            }
        }
    }

    impl AsyncRead for TrickleReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let this = self.get_mut();
            if this.pos == this.data.len() && this.fail_at_end {
                return Poll::Ready(Err(std::io::Error::new(
                    ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )));
            }
            let n = this
                .chunk
                .min(buf.remaining())
                .min(this.data.len() - this.pos);
            buf.put_slice(&this.data[this.pos..this.pos + n]);
            this.pos += n;
            Poll::Ready(Ok(()))
        }
    }

    impl Drop for TrickleReader {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    async fn round_trip(data: Vec<u8>, chunk: usize) -> (Vec<u8>, String) {
        let drops = Arc::new(AtomicUsize::new(0));
        let reader = TrickleReader::new(data, chunk, drops.clone());
        let (mut stream, content_type) = sniff_stream(ObjectStream::new(reader)).await.unwrap();

        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(stream);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        (out, content_type)
    }

    #[tokio::test]
    async fn test_empty_object_has_no_content_type() {
        let (out, content_type) = round_trip(Vec::new(), 64).await;
        assert!(out.is_empty());
        assert_eq!(content_type, "");
    }

    #[tokio::test]
    async fn test_bytes_survive_sniffing() {
        for len in [1, 100, SNIFF_LEN - 1, SNIFF_LEN, SNIFF_LEN + 1, 10 * SNIFF_LEN + 7] {
            for chunk in [1, 7, SNIFF_LEN, 4096] {
                let data = payload(len);
                let (out, _) = round_trip(data.clone(), chunk).await;
                assert_eq!(out, data, "len={} chunk={}", len, chunk);
            }
        }
    }

    #[tokio::test]
    async fn test_png_detected_across_short_reads() {
        let mut data = b"\x89PNG\x0D\x0A\x1A\x0A".to_vec();
        data.extend(payload(2000));
        let (out, content_type) = round_trip(data.clone(), 3).await;
        assert_eq!(content_type, "image/png");
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn test_read_error_releases_stream() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut reader = TrickleReader::new(payload(100), 16, drops.clone());
        reader.fail_at_end = true;

        let err = sniff_stream(ObjectStream::new(reader)).await.unwrap_err();

        assert!(matches!(err, StorageError::Io(_)));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
