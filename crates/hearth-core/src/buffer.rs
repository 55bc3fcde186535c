//! Fixed-capacity buffers owned by a decompression session.

use crate::{Error, Result, StreamConfig};

/// A fixed-capacity byte buffer.
///
/// Mirrors the engine's view of memory: a region of `capacity()` bytes of
/// which the first `len()` are meaningful. The backing allocation never
/// grows after construction.
#[derive(Debug)]
pub struct FixedBuffer {
    /// Internal buffer storage, always `capacity` bytes long.
    data: Vec<u8>,
    /// Number of valid bytes at the start of `data`.
    len: usize,
}

impl FixedBuffer {
    /// Allocate a zeroed buffer, reporting allocation failure instead of aborting.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| Error::AllocationFailed {
                requested_bytes: capacity,
            })?;
        data.resize(capacity, 0);
        Ok(Self { data, len: 0 })
    }

    /// Get the buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of valid bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no valid bytes are held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Replace the contents with a prefix of `src`.
    ///
    /// Copies at most `capacity()` bytes and returns how many were copied.
    pub fn load(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.data.len());
        self.data[..n].copy_from_slice(&src[..n]);
        self.len = n;
        n
    }

    /// Mark the first `len` bytes as valid (clamped to capacity).
    #[inline]
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.data.len());
    }

    /// Valid bytes.
    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The whole region, valid or not.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the whole region.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Reset to empty without releasing memory.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// The input/output buffer pair a session feeds to its engine.
#[derive(Debug)]
pub struct BufferPair {
    pub input: FixedBuffer,
    pub output: FixedBuffer,
}

impl BufferPair {
    /// Allocate both buffers for a configuration.
    pub fn allocate(config: &StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            input: FixedBuffer::with_capacity(config.input_buffer_size)?,
            output: FixedBuffer::with_capacity(config.output_buffer_size)?,
        })
    }

    /// Input and output split for a single engine call.
    #[inline]
    pub fn split(&mut self) -> (&FixedBuffer, &mut FixedBuffer) {
        (&self.input, &mut self.output)
    }

    /// Total bytes held by both allocations.
    pub fn footprint(&self) -> usize {
        self.input.capacity() + self.output.capacity()
    }
}
