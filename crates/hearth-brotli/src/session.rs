//! Brotli decompression session.

use bytes::Bytes;
use hearth_core::{
    Algorithm, BufferPair, ChunkSink, DecodeStats, Error, Phase, Result, StreamConfig,
    StreamState, StreamingDecompressor,
};
use tracing::debug;

use crate::engine::{BrotliCursor, BrotliEngine, NativeBrotli};

/// Streaming Brotli decompressor.
///
/// Owns one engine instance and a fixed input/output buffer pair for its
/// whole life. Both are released exactly once: at `flush`, on the first
/// engine error, or when the session is dropped unfinished.
pub struct BrotliSession<E: BrotliEngine = NativeBrotli> {
    engine: Option<E>,
    buffers: Option<BufferPair>,
    cursor: BrotliCursor,
    phase: Phase,
    state: StreamState,
    stats: DecodeStats,
}

impl BrotliSession<NativeBrotli> {
    /// Create a session with the legacy 1 MiB buffers.
    pub fn new() -> Result<Self> {
        Self::with_config(StreamConfig::legacy())
    }

    /// Create a session with the 512 KiB buffer-pair profile.
    pub fn paired() -> Result<Self> {
        Self::with_config(StreamConfig::paired())
    }

    /// Create a session with custom buffer sizes.
    pub fn with_config(config: StreamConfig) -> Result<Self> {
        Self::with_engine(NativeBrotli::new(), config)
    }
}

impl<E: BrotliEngine> BrotliSession<E> {
    /// Create a session around an existing engine.
    pub fn with_engine(engine: E, config: StreamConfig) -> Result<Self> {
        let buffers = BufferPair::allocate(&config)?;
        let cursor = BrotliCursor::start(buffers.output.capacity());
        debug!(
            input = config.input_buffer_size,
            output = config.output_buffer_size,
            "brotli session started"
        );

        Ok(Self {
            engine: Some(engine),
            buffers: Some(buffers),
            cursor,
            phase: Phase::NeedsMoreInput,
            state: StreamState::Initial,
            stats: DecodeStats::for_algorithm(Algorithm::Brotli),
        })
    }

    /// The engine's demand after the last step.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Check if the engine and buffers are still held.
    pub fn holds_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Feed one chunk through the engine until it is consumed or the
    /// stream ends.
    fn pump(&mut self, chunk: &[u8], sink: &mut dyn ChunkSink) -> Result<()> {
        let Self {
            engine,
            buffers,
            cursor,
            phase,
            stats,
            ..
        } = self;
        let (Some(engine), Some(buffers)) = (engine.as_mut(), buffers.as_mut()) else {
            return Err(Error::invalid_state("active", "released"));
        };

        let capacity = buffers.output.capacity();
        let mut offset = 0;

        loop {
            match *phase {
                Phase::NeedsMoreInput => {
                    if offset >= chunk.len() {
                        break;
                    }
                    let loaded = buffers.input.load(&chunk[offset..]);
                    cursor.refill(loaded);
                    offset += loaded;
                }
                Phase::NeedsMoreOutput => {
                    let filled =
                        Bytes::copy_from_slice(&buffers.output.as_slice()[..cursor.next_out]);
                    stats.record_output(filled.len());
                    sink.push(filled);
                    cursor.drain(capacity);
                }
                Phase::Success | Phase::Error => break,
            }

            let (input, output) = buffers.split();
            *phase = engine.decompress_stream(cursor, input.filled(), output.as_mut_slice());
            stats.engine_steps += 1;
        }

        Ok(())
    }

    /// Drop the engine and buffers. Returns whether anything was held.
    fn release(&mut self) -> bool {
        let engine = self.engine.take();
        let buffers = self.buffers.take();
        engine.is_some() || buffers.is_some()
    }

    fn fail(&mut self, err: Error) -> Error {
        self.release();
        self.state = StreamState::Failed;
        debug!(
            bytes_in = self.stats.bytes_in,
            bytes_out = self.stats.bytes_out,
            category = err.category(),
            "brotli session failed"
        );
        err
    }
}

impl<E: BrotliEngine> StreamingDecompressor for BrotliSession<E> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Brotli
    }

    fn state(&self) -> StreamState {
        self.state
    }

    fn transform(&mut self, chunk: &[u8], sink: &mut dyn ChunkSink) -> Result<()> {
        if !self.state.can_write() {
            return Err(Error::invalid_state("active", self.state.name()));
        }
        self.state = StreamState::Active;
        self.stats.record_input(chunk.len());

        self.pump(chunk, sink)?;

        if self.phase == Phase::Error {
            return Err(self.fail(Error::corrupted("corrupt input")));
        }
        Ok(())
    }

    fn flush(&mut self, sink: &mut dyn ChunkSink) -> Result<()> {
        if !self.state.can_write() {
            return Err(Error::invalid_state("active", self.state.name()));
        }

        if let Some(buffers) = self.buffers.as_ref() {
            if self.cursor.next_out > 0 {
                let rest =
                    Bytes::copy_from_slice(&buffers.output.as_slice()[..self.cursor.next_out]);
                self.stats.record_output(rest.len());
                sink.push(rest);
                self.cursor.next_out = 0;
            }
        }

        match self.phase {
            Phase::Success => {
                self.release();
                self.state = StreamState::Finished;
                debug!(
                    bytes_in = self.stats.bytes_in,
                    bytes_out = self.stats.bytes_out,
                    steps = self.stats.engine_steps,
                    "brotli session finished"
                );
                Ok(())
            }
            Phase::NeedsMoreOutput => Err(self.fail(Error::OutputStalled)),
            Phase::NeedsMoreInput | Phase::Error => {
                Err(self.fail(Error::corrupted("corrupt input")))
            }
        }
    }

    fn stats(&self) -> &DecodeStats {
        &self.stats
    }
}

impl<E: BrotliEngine> Drop for BrotliSession<E> {
    fn drop(&mut self) {
        if self.release() {
            debug!(
                bytes_in = self.stats.bytes_in,
                "released abandoned brotli session"
            );
        }
    }
}

impl<E: BrotliEngine> std::fmt::Debug for BrotliSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrotliSession")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("holds_engine", &self.engine.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::decompress_chunks;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 6, 22);
            writer.write_all(data).unwrap();
        }
        out
    }

    fn sample(len: usize) -> Vec<u8> {
        let pattern = b"The quick brown fox jumps over the lazy dog. ";
        pattern.iter().cycle().take(len).copied().collect()
    }

    fn noise(len: usize) -> Vec<u8> {
        let mut x: u32 = 0x9e37_79b9;
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            })
            .collect()
    }

    /// Native engine that counts how often it is dropped.
    struct CountingEngine {
        inner: NativeBrotli,
        drops: Arc<AtomicUsize>,
    }

    impl BrotliEngine for CountingEngine {
        fn decompress_stream(
            &mut self,
            cursor: &mut BrotliCursor,
            input: &[u8],
            output: &mut [u8],
        ) -> Phase {
            self.inner.decompress_stream(cursor, input, output)
        }
    }

    impl Drop for CountingEngine {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_session(config: StreamConfig) -> (BrotliSession<CountingEngine>, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let engine = CountingEngine {
            inner: NativeBrotli::new(),
            drops: drops.clone(),
        };
        (BrotliSession::with_engine(engine, config).unwrap(), drops)
    }

    #[test]
    fn test_single_chunk_roundtrip() {
        let input = sample(10_000);
        let compressed = compress(&input);

        let mut session = BrotliSession::new().unwrap();
        let out = decompress_chunks(&mut session, [compressed.as_slice()]).unwrap();

        assert_eq!(out, input);
        assert_eq!(session.state(), StreamState::Finished);
        assert!(!session.holds_engine());
    }

    #[test]
    fn test_roundtrip_empty() {
        let compressed = compress(b"");
        let mut session = BrotliSession::new().unwrap();
        let out = decompress_chunks(&mut session, [compressed.as_slice()]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_multi_chunk_matches_single_chunk() {
        let input = sample(50_000);
        let compressed = compress(&input);

        let mut one = BrotliSession::new().unwrap();
        let single = decompress_chunks(&mut one, [compressed.as_slice()]).unwrap();

        let mut many = BrotliSession::new().unwrap();
        let multi = decompress_chunks(&mut many, compressed.chunks(7)).unwrap();

        assert_eq!(single, multi);
        assert_eq!(multi, input);
    }

    #[test]
    fn test_small_buffers_emit_full_chunks() {
        let input = sample(5_000);
        let compressed = compress(&input);

        let mut session = BrotliSession::with_config(StreamConfig::symmetric(64)).unwrap();
        let mut chunks: Vec<Bytes> = Vec::new();
        session.transform(&compressed, &mut chunks).unwrap();
        session.flush(&mut chunks).unwrap();

        let (last, full) = chunks.split_last().unwrap();
        assert!(full.iter().all(|c| c.len() == 64));
        assert!(last.len() <= 64);
        assert_eq!(chunks.concat(), input);
        assert!(session.stats().engine_steps > 1);
        assert_eq!(session.stats().bytes_out, input.len() as u64);
    }

    #[test]
    fn test_chunk_larger_than_input_buffer() {
        let input = noise(20_000);
        let compressed = compress(&input);
        assert!(compressed.len() > 128);

        let mut session = BrotliSession::with_config(StreamConfig {
            input_buffer_size: 128,
            output_buffer_size: 4096,
        })
        .unwrap();
        let out = decompress_chunks(&mut session, [compressed.as_slice()]).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_zero_length_chunk() {
        let input = sample(1_000);
        let compressed = compress(&input);

        let mut session = BrotliSession::new().unwrap();
        let out = decompress_chunks(
            &mut session,
            [&[][..], compressed.as_slice(), &[][..]],
        )
        .unwrap();
        assert_eq!(out, input);
        assert_eq!(session.stats().chunks_in, 3);
    }

    #[test]
    fn test_trailing_input_after_success_is_ignored() {
        let input = sample(300);
        let mut compressed = compress(&input);
        compressed.extend_from_slice(b"trailing garbage");

        let mut session = BrotliSession::new().unwrap();
        let out = decompress_chunks(&mut session, [compressed.as_slice()]).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_corrupt_input_is_an_error() {
        let mut session = BrotliSession::new().unwrap();
        let result = decompress_chunks(
            &mut session,
            [&b"this is definitely not a brotli stream, not even close"[..]],
        );
        let err = result.unwrap_err();
        assert_eq!(err.category(), "corrupted_data");
        assert_eq!(session.state(), StreamState::Failed);
        assert!(!session.holds_engine());
    }

    #[test]
    fn test_truncated_input_fails_at_flush() {
        let input = sample(10_000);
        let compressed = compress(&input);
        let truncated = &compressed[..compressed.len() / 2];

        let mut session = BrotliSession::new().unwrap();
        let mut out = Vec::<u8>::new();
        session.transform(truncated, &mut out).unwrap();

        let err = session.flush(&mut out).unwrap_err();
        assert_eq!(err.to_string(), "corrupted data: corrupt input");
        assert!(input.starts_with(&out));
    }

    #[test]
    fn test_output_stalled_at_flush() {
        let mut session = BrotliSession::with_config(StreamConfig::symmetric(16)).unwrap();
        session.phase = Phase::NeedsMoreOutput;
        let err = session.flush(&mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, Error::OutputStalled));
        assert!(!session.holds_engine());
    }

    #[test]
    fn test_rejects_input_after_flush() {
        let compressed = compress(b"done");
        let mut session = BrotliSession::new().unwrap();
        let mut out = Vec::<u8>::new();
        session.transform(&compressed, &mut out).unwrap();
        session.flush(&mut out).unwrap();

        let err = session.transform(b"more", &mut out).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert!(session.flush(&mut out).is_err());
    }

    #[test]
    fn test_engine_released_once_on_success() {
        let compressed = compress(&sample(2_000));
        let (mut session, drops) = counting_session(StreamConfig::symmetric(256));

        decompress_chunks(&mut session, compressed.chunks(100)).unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        drop(session);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_engine_released_once_on_error() {
        let (mut session, drops) = counting_session(StreamConfig::symmetric(256));
        let _ = decompress_chunks(&mut session, [&[0xffu8; 64][..]]);
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        drop(session);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn abandoned_session_releases_engine_on_drop() {
        let compressed = compress(&sample(2_000));
        let (mut session, drops) = counting_session(StreamConfig::symmetric(256));
        session
            .transform(&compressed[..compressed.len() / 2], &mut Vec::<u8>::new())
            .unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(session);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
