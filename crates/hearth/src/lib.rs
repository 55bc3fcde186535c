//! # Hearth
//!
//! Asset delivery pieces for game engines exported to the web.
//!
//! Hearth covers the two jobs a web export has besides running the game:
//! decompressing packaged assets as they stream in, and keeping the export
//! playable offline.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hearth::{decompress_chunks, BrotliSession};
//!
//! let mut session = BrotliSession::new()?;
//! let pck = decompress_chunks(&mut session, network_chunks)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `brotli` - Brotli streaming sessions (default)
//! - `zstd` - Zstandard streaming sessions (default)
//! - `stream` - `Read` and `Stream` adapters (default)
//! - `offline` - service worker cache coordination (default)

// Re-export core traits and types
pub use hearth_core::{
    decompress_chunks, Algorithm, BufferPair, ChunkSink, DecodeStats, Decompressor, Error,
    FixedBuffer, Phase, Result, StreamConfig, StreamState, StreamingDecompressor,
};

// Re-export Brotli
#[cfg(feature = "brotli")]
pub use hearth_brotli::{BrotliDecompressor, BrotliSession};

// Re-export Zstd
#[cfg(feature = "zstd")]
pub use hearth_zstd::{ZstdDecompressor, ZstdSession};

// Re-export streaming adapters
#[cfg(feature = "stream")]
pub mod stream {
    //! Adapters running a session over a reader or a chunk stream.
    pub use hearth_stream::{
        open_session, open_session_with, BoxedSession, DecompressReader, DecompressStream,
        DecompressStreamExt, DEFAULT_CHUNK_SIZE,
    };
}

// Re-export offline caching
#[cfg(feature = "offline")]
pub mod offline {
    //! Offline cache coordination for service workers.
    pub use hearth_offline::*;
}

/// Prelude for common imports
pub mod prelude {
    pub use super::{Algorithm, Decompressor, Error, Result, StreamConfig, StreamingDecompressor};

    #[cfg(feature = "brotli")]
    pub use super::BrotliSession;

    #[cfg(feature = "zstd")]
    pub use super::ZstdSession;
}
