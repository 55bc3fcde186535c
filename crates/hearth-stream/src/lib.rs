//! # Hearth Stream
//!
//! Adapters that run a decompression session over a source of chunks.
//!
//! - [`DecompressReader`]: wraps any [`std::io::Read`] of compressed bytes
//! - [`DecompressStream`]: wraps any `Stream<Item = Result<Bytes, E>>` and
//!   yields decompressed [`Bytes`](bytes::Bytes) lazily (feature `async`)
//!
//! Both adapters flush the session once the source is exhausted and stop
//! producing output after the first error.
//!
//! ## Example
//!
//! ```ignore
//! use futures::{StreamExt, TryStreamExt};
//! use hearth_core::Algorithm;
//! use hearth_stream::{open_session, DecompressStream};
//!
//! let session = open_session(Algorithm::Zstd)?;
//! let chunks = response.bytes_stream().map_err(std::io::Error::other);
//! let mut plain = DecompressStream::new(chunks, session);
//! while let Some(chunk) = plain.next().await {
//!     runtime.feed(chunk?);
//! }
//! ```

mod reader;
mod session;

#[cfg(feature = "async")]
mod async_io;

pub use reader::DecompressReader;
pub use session::{open_session, open_session_with, BoxedSession};

#[cfg(feature = "async")]
pub use async_io::{DecompressStream, DecompressStreamExt};

/// Default read size for [`DecompressReader`] (64 KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
