//! # Hearth Zstd
//!
//! Streaming Zstandard decompression (RFC 8878).
//!
//! [`ZstdSession`] feeds each incoming chunk to a libzstd decompression
//! context through two `{size, pos}` descriptors and emits whatever the
//! context writes. The context's return hint is kept between chunks; a
//! nonzero hint at flush means the last frame never completed.
//!
//! ## Example
//!
//! ```ignore
//! use hearth_core::decompress_chunks;
//! use hearth_zstd::ZstdSession;
//!
//! let mut session = ZstdSession::new()?;
//! let wasm = decompress_chunks(&mut session, chunks.iter().map(|c| c.as_ref()))?;
//! ```

mod engine;
mod session;

pub use engine::{EngineFault, NativeZstd, ZstdDescriptor, ZstdEngine};
pub use session::ZstdSession;

use hearth_core::{decompress_chunks, Algorithm, Decompressor, Result, StreamConfig};

/// One-shot Zstandard decompressor.
#[derive(Debug, Clone)]
pub struct ZstdDecompressor {
    config: StreamConfig,
}

impl ZstdDecompressor {
    /// Create a decompressor with the library-recommended buffer sizes.
    pub fn new() -> Self {
        Self {
            config: NativeZstd::recommended_config(),
        }
    }

    /// Create with custom session buffers.
    pub fn with_config(config: StreamConfig) -> Self {
        Self { config }
    }
}

impl Default for ZstdDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for ZstdDecompressor {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zstd
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut session = ZstdSession::with_config(self.config.clone())?;
        decompress_chunks(&mut session, [input])
    }
}
