//! Core traits for streaming decompression.
//!
//! ## Trait Hierarchy
//!
//! ```text
//! StreamingDecompressor  (chunk in, chunks out, flush)
//!       ↓
//! Decompressor  (one-shot, built on a fresh session)
//! ```

use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::Result;
use crate::stats::DecodeStats;
use crate::stream::StreamState;
use crate::types::Algorithm;

/// Destination for decompressed chunks.
pub trait ChunkSink {
    /// Receive one decompressed chunk.
    fn push(&mut self, chunk: Bytes);
}

impl ChunkSink for Vec<Bytes> {
    fn push(&mut self, chunk: Bytes) {
        Vec::push(self, chunk);
    }
}

impl ChunkSink for Vec<u8> {
    fn push(&mut self, chunk: Bytes) {
        self.extend_from_slice(&chunk);
    }
}

impl ChunkSink for VecDeque<Bytes> {
    fn push(&mut self, chunk: Bytes) {
        self.push_back(chunk);
    }
}

impl<F: FnMut(Bytes)> ChunkSink for F {
    fn push(&mut self, chunk: Bytes) {
        self(chunk)
    }
}

/// A byte-stream transform that decompresses incrementally.
///
/// Chunks must be fed in the order they were received. After `flush` (or
/// after any terminal error) the session has released its engine and
/// rejects further input.
pub trait StreamingDecompressor {
    /// Get the decompression algorithm.
    fn algorithm(&self) -> Algorithm;

    /// Current lifecycle state.
    fn state(&self) -> StreamState;

    /// Decompress one input chunk of any length.
    ///
    /// Output produced while processing the chunk is pushed to `sink`;
    /// output that does not fill a whole buffer may be held until a later
    /// chunk or `flush`.
    fn transform(&mut self, chunk: &[u8], sink: &mut dyn ChunkSink) -> Result<()>;

    /// Signal end of input, emit any remaining output, and release the
    /// engine.
    fn flush(&mut self, sink: &mut dyn ChunkSink) -> Result<()>;

    /// Counters for this session.
    fn stats(&self) -> &DecodeStats;

    /// Check if the session has ended.
    fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }
}

impl<D: StreamingDecompressor + ?Sized> StreamingDecompressor for Box<D> {
    fn algorithm(&self) -> Algorithm {
        (**self).algorithm()
    }

    fn state(&self) -> StreamState {
        (**self).state()
    }

    fn transform(&mut self, chunk: &[u8], sink: &mut dyn ChunkSink) -> Result<()> {
        (**self).transform(chunk, sink)
    }

    fn flush(&mut self, sink: &mut dyn ChunkSink) -> Result<()> {
        (**self).flush(sink)
    }

    fn stats(&self) -> &DecodeStats {
        (**self).stats()
    }
}

/// One-shot decompression operations.
pub trait Decompressor {
    /// Get the decompression algorithm.
    fn algorithm(&self) -> Algorithm;

    /// Decompress data in one shot.
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Run a session over a sequence of chunks and collect the output.
pub fn decompress_chunks<'a, D, I>(session: &mut D, chunks: I) -> Result<Vec<u8>>
where
    D: StreamingDecompressor + ?Sized,
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut output = Vec::new();
    for chunk in chunks {
        session.transform(chunk, &mut output)?;
    }
    session.flush(&mut output)?;
    Ok(output)
}
