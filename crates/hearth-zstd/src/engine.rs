//! The Zstandard engine seam.

use hearth_core::{Error, Result, StreamConfig};
use zstd::zstd_safe::{self, DCtx, InBuffer, OutBuffer};

/// A `{size, pos}` view over one of the session buffers.
///
/// `size` is the number of usable bytes; `pos` is how far the engine has
/// read (input) or written (output).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZstdDescriptor {
    pub size: usize,
    pub pos: usize,
}

impl ZstdDescriptor {
    /// Descriptor over `size` fresh bytes.
    pub fn new(size: usize) -> Self {
        Self { size, pos: 0 }
    }

    /// Check if every byte has been consumed or written.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.size
    }
}

/// An error code reported by the engine, with its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFault {
    pub code: usize,
    pub name: String,
}

/// A streaming Zstandard decompression context.
///
/// Dropping the engine frees the context.
pub trait ZstdEngine {
    /// Run one streaming step.
    ///
    /// Returns the engine's hint: `0` once a frame is fully decoded and
    /// flushed, otherwise a nonzero size suggestion for the next input.
    fn decompress_stream(
        &mut self,
        output: &mut [u8],
        out: &mut ZstdDescriptor,
        input: &[u8],
        inp: &mut ZstdDescriptor,
    ) -> std::result::Result<usize, EngineFault>;
}

/// The libzstd decompression context.
pub struct NativeZstd {
    ctx: DCtx<'static>,
}

impl NativeZstd {
    /// Create a new decompression context.
    pub fn new() -> Result<Self> {
        let ctx = DCtx::try_create()
            .ok_or_else(|| Error::algorithm("zstd", "could not create decompression context"))?;
        Ok(Self { ctx })
    }

    /// Buffer sizes recommended by the library for streaming.
    pub fn recommended_config() -> StreamConfig {
        StreamConfig {
            input_buffer_size: DCtx::in_size(),
            output_buffer_size: DCtx::out_size(),
        }
    }
}

impl std::fmt::Debug for NativeZstd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeZstd").finish_non_exhaustive()
    }
}

impl ZstdEngine for NativeZstd {
    fn decompress_stream(
        &mut self,
        output: &mut [u8],
        out: &mut ZstdDescriptor,
        input: &[u8],
        inp: &mut ZstdDescriptor,
    ) -> std::result::Result<usize, EngineFault> {
        let mut in_buf = InBuffer::around(&input[..inp.size]);
        in_buf.set_pos(inp.pos);
        let mut out_buf = OutBuffer::around_pos(&mut output[..out.size], out.pos);

        let result = self.ctx.decompress_stream(&mut out_buf, &mut in_buf);
        inp.pos = in_buf.pos();
        out.pos = out_buf.pos();

        result.map_err(|code| EngineFault {
            code,
            name: zstd_safe::get_error_name(code).to_string(),
        })
    }
}
