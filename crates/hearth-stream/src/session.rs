//! Session selection by algorithm.

use hearth_brotli::BrotliSession;
use hearth_core::{Algorithm, Result, StreamConfig, StreamingDecompressor};
use hearth_zstd::ZstdSession;

/// A type-erased session that can move between threads.
pub type BoxedSession = Box<dyn StreamingDecompressor + Send>;

/// Open a session with the algorithm's default buffers.
///
/// Brotli uses the legacy 1 MiB buffers; Zstandard uses the library's
/// recommended streaming sizes.
pub fn open_session(algorithm: Algorithm) -> Result<BoxedSession> {
    Ok(match algorithm {
        Algorithm::Brotli => Box::new(BrotliSession::new()?),
        Algorithm::Zstd => Box::new(ZstdSession::new()?),
    })
}

/// Open a session with explicit buffer sizes.
pub fn open_session_with(algorithm: Algorithm, config: StreamConfig) -> Result<BoxedSession> {
    Ok(match algorithm {
        Algorithm::Brotli => Box::new(BrotliSession::with_config(config)?),
        Algorithm::Zstd => Box::new(ZstdSession::with_config(config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_by_algorithm() {
        for algorithm in [Algorithm::Brotli, Algorithm::Zstd] {
            let session = open_session_with(algorithm, StreamConfig::symmetric(1024)).unwrap();
            assert_eq!(session.algorithm(), algorithm);
            assert!(!session.is_finished());
        }
    }

    #[test]
    fn test_open_rejects_zero_buffers() {
        assert!(open_session_with(Algorithm::Zstd, StreamConfig::symmetric(0)).is_err());
    }
}
