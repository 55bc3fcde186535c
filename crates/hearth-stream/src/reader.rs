//! Blocking read adapter for streaming decompression.

use std::collections::VecDeque;
use std::io::{self, Read};

use bytes::{Buf, Bytes};
use hearth_core::StreamingDecompressor;

use crate::DEFAULT_CHUNK_SIZE;

/// A reader that decompresses data from the inner reader.
///
/// Every `read` on the inner reader becomes one chunk for the session;
/// end of file triggers the session's flush.
pub struct DecompressReader<R: Read, D: StreamingDecompressor> {
    inner: R,
    session: D,
    chunk: Vec<u8>,
    pending: VecDeque<Bytes>,
    eof: bool,
    failed: bool,
}

impl<R: Read, D: StreamingDecompressor> DecompressReader<R, D> {
    /// Create a new decompressing reader with the default chunk size.
    pub fn new(inner: R, session: D) -> Self {
        Self::with_chunk_size(inner, session, DEFAULT_CHUNK_SIZE)
    }

    /// Create a new decompressing reader reading `chunk_size` bytes at a time.
    pub fn with_chunk_size(inner: R, session: D, chunk_size: usize) -> Self {
        Self {
            inner,
            session,
            chunk: vec![0; chunk_size.max(1)],
            pending: VecDeque::new(),
            eof: false,
            failed: false,
        }
    }

    /// Get a reference to the inner reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Get a reference to the session.
    pub fn session(&self) -> &D {
        &self.session
    }

    /// Unwrap into the inner reader and the session.
    pub fn into_parts(self) -> (R, D) {
        (self.inner, self.session)
    }

    /// Pull one chunk from the inner reader through the session.
    fn pump(&mut self) -> io::Result<()> {
        let n = loop {
            match self.inner.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        let result = if n == 0 {
            self.eof = true;
            self.session.flush(&mut self.pending)
        } else {
            self.session.transform(&self.chunk[..n], &mut self.pending)
        };

        result.map_err(|e| {
            self.failed = true;
            self.pending.clear();
            io::Error::from(e)
        })
    }
}

impl<R: Read, D: StreamingDecompressor> Read for DecompressReader<R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if let Some(front) = self.pending.front_mut() {
                let n = buf.len().min(front.len());
                buf[..n].copy_from_slice(&front[..n]);
                front.advance(n);
                if front.is_empty() {
                    self.pending.pop_front();
                }
                return Ok(n);
            }

            if self.failed {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "decompression already failed",
                ));
            }
            if self.eof {
                return Ok(0);
            }

            self.pump()?;
        }
    }
}
