//! Async stream adapter for streaming decompression.
//!
//! [`DecompressStream`] turns a stream of compressed chunks into a lazy,
//! finite, non-restartable stream of decompressed chunks.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{ready, Stream};
use pin_project_lite::pin_project;
use tracing::warn;

use hearth_core::{Error, Result, StreamingDecompressor};

pin_project! {
    /// A stream that decompresses the chunks of the inner stream.
    ///
    /// Output produced by one input chunk is yielded before the next input
    /// chunk is polled. The session is flushed when the inner stream ends.
    pub struct DecompressStream<S, D> {
        #[pin]
        inner: S,
        session: D,
        pending: VecDeque<Bytes>,
        done: bool,
    }
}

impl<S, D> DecompressStream<S, D>
where
    D: StreamingDecompressor,
{
    /// Wrap a stream of compressed chunks.
    pub fn new(inner: S, session: D) -> Self {
        Self {
            inner,
            session,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Get a reference to the session.
    pub fn session(&self) -> &D {
        &self.session
    }

    /// Get a reference to the inner stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, E, D> Stream for DecompressStream<S, D>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Error>,
    D: StreamingDecompressor,
{
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(chunk) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(chunk)));
            }
            if *this.done {
                return Poll::Ready(None);
            }

            let step = match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.session.transform(&chunk, &mut *this.pending),
                Some(Err(e)) => {
                    warn!("compressed source failed mid-stream");
                    Err(e.into())
                }
                None => {
                    *this.done = true;
                    this.session.flush(&mut *this.pending)
                }
            };

            if let Err(e) = step {
                *this.done = true;
                this.pending.clear();
                return Poll::Ready(Some(Err(e)));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (self.pending.len(), Some(self.pending.len()))
        } else {
            (self.pending.len(), None)
        }
    }
}

/// Extension for decompressing a stream of chunks.
pub trait DecompressStreamExt: Sized {
    /// Decompress this stream with `session`.
    fn decompress_with<D: StreamingDecompressor>(self, session: D) -> DecompressStream<Self, D> {
        DecompressStream::new(self, session)
    }
}

impl<S, E> DecompressStreamExt for S where S: Stream<Item = std::result::Result<Bytes, E>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_session_with;
    use futures::stream::{self, StreamExt};
    use hearth_core::{Algorithm, StreamConfig};
    use hearth_zstd::ZstdSession;
    use std::io::Write;

    fn sample(len: usize) -> Vec<u8> {
        b"index.pck ".iter().cycle().take(len).copied().collect()
    }

    fn chunked(data: &[u8], size: usize) -> Vec<std::io::Result<Bytes>> {
        data.chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect()
    }

    #[tokio::test]
    async fn test_stream_zstd_roundtrip() {
        let input = sample(150_000);
        let compressed = zstd::encode_all(input.as_slice(), 3).unwrap();

        let session = ZstdSession::with_config(StreamConfig::symmetric(4096)).unwrap();
        let chunks: Vec<Bytes> = stream::iter(chunked(&compressed, 333))
            .decompress_with(session)
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), input);
    }

    #[tokio::test]
    async fn test_stream_brotli_roundtrip() {
        let input = sample(40_000);
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 9, 22);
            writer.write_all(&input).unwrap();
        }

        let session = open_session_with(Algorithm::Brotli, StreamConfig::symmetric(1024)).unwrap();
        let mut stream = DecompressStream::new(stream::iter(chunked(&compressed, 50)), session);

        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(out, input);
        assert!(stream.session().is_finished());
    }

    #[tokio::test]
    async fn test_stream_stops_after_error() {
        let compressed = zstd::encode_all(sample(10_000).as_slice(), 3).unwrap();
        let truncated = &compressed[..compressed.len() - 4];

        let session = ZstdSession::new().unwrap();
        let items: Vec<Result<Bytes>> = stream::iter(chunked(truncated, 100))
            .decompress_with(session)
            .collect()
            .await;

        let (last, before) = items.split_last().unwrap();
        assert!(matches!(last, Err(Error::UnexpectedEof { .. })));
        assert!(before.iter().all(|c| c.is_ok()));
    }

    #[tokio::test]
    async fn test_source_error_is_forwarded() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"\x28\xb5")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"never read")),
        ]);
        let items: Vec<Result<Bytes>> = source
            .decompress_with(ZstdSession::new().unwrap())
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_empty_source() {
        let items: Vec<Result<Bytes>> = stream::iter(Vec::<std::io::Result<Bytes>>::new())
            .decompress_with(ZstdSession::new().unwrap())
            .collect()
            .await;
        assert!(items.is_empty());
    }
}
