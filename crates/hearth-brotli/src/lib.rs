//! # Hearth Brotli
//!
//! Streaming Brotli decompression (RFC 7932) over fixed session buffers.
//!
//! A [`BrotliSession`] drives the decoder one engine step at a time. After
//! every step the engine reports a [`Phase`](hearth_core::Phase) and the
//! session acts on it:
//!
//! - **NeedsMoreInput**: load the next slice of the current chunk, or return
//!   and wait for the next chunk
//! - **NeedsMoreOutput**: emit the full output buffer and drain it
//! - **Success** / **Error**: stop stepping
//!
//! ## Example
//!
//! ```ignore
//! use hearth_brotli::BrotliSession;
//! use hearth_core::StreamingDecompressor;
//!
//! let mut session = BrotliSession::new()?;
//! let mut out: Vec<u8> = Vec::new();
//! for chunk in network_chunks {
//!     session.transform(&chunk, &mut out)?;
//! }
//! session.flush(&mut out)?;
//! ```
//!
//! ## Implementation
//!
//! This crate wraps the decoder state of the `brotli` crate behind the
//! [`BrotliEngine`] trait so sessions can be exercised with instrumented
//! engines.

mod engine;
mod session;

pub use engine::{BrotliCursor, BrotliEngine, NativeBrotli};
pub use session::BrotliSession;

use hearth_core::{decompress_chunks, Algorithm, Decompressor, Result, StreamConfig};

/// One-shot Brotli decompressor.
///
/// Runs a fresh [`BrotliSession`] over the whole input.
#[derive(Debug, Clone)]
pub struct BrotliDecompressor {
    config: StreamConfig,
}

impl BrotliDecompressor {
    /// Create a decompressor using the buffer-pair profile.
    pub fn new() -> Self {
        Self {
            config: StreamConfig::paired(),
        }
    }

    /// Create with custom session buffers.
    pub fn with_config(config: StreamConfig) -> Self {
        Self { config }
    }
}

impl Default for BrotliDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for BrotliDecompressor {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Brotli
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut session = BrotliSession::with_config(self.config.clone())?;
        decompress_chunks(&mut session, [input])
    }
}
