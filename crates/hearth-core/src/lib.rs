//! # Hearth Core
//!
//! Core traits, types, and streaming state for Hearth's asset decompressors.
//!
//! Hearth feeds packaged game assets (Brotli or Zstandard compressed) into a
//! runtime one network chunk at a time. Every codec crate in the workspace
//! builds on the pieces defined here:
//!
//! - [`Phase`] - the engine's current demand after a decompression step
//! - [`StreamState`] - lifecycle of a decompression session
//! - [`FixedBuffer`] / [`BufferPair`] - fixed-capacity session buffers
//! - [`StreamingDecompressor`] - the chunk-in, chunks-out transform contract
//! - [`ChunkSink`] - where decompressed chunks are emitted
//!
//! ## Example
//!
//! ```ignore
//! use hearth_core::{decompress_chunks, StreamingDecompressor};
//! use hearth_brotli::BrotliSession;
//!
//! let mut session = BrotliSession::new()?;
//! let plain = decompress_chunks(&mut session, network_chunks)?;
//! ```

pub mod buffer;
pub mod error;
pub mod stats;
pub mod stream;
pub mod traits;
pub mod types;

pub use buffer::{BufferPair, FixedBuffer};
pub use error::{Error, Result};
pub use stats::DecodeStats;
pub use stream::{Phase, StreamConfig, StreamState};
pub use traits::{decompress_chunks, ChunkSink, Decompressor, StreamingDecompressor};
pub use types::Algorithm;
