//! Zstandard decompression session.

use bytes::Bytes;
use hearth_core::{
    Algorithm, BufferPair, ChunkSink, DecodeStats, Error, Phase, Result, StreamConfig,
    StreamState, StreamingDecompressor,
};
use tracing::debug;

use crate::engine::{EngineFault, NativeZstd, ZstdDescriptor, ZstdEngine};

/// Streaming Zstandard decompressor.
///
/// Each chunk is sliced to the input buffer's capacity. Every slice is
/// stepped until the engine has read all of it and left room in the output
/// buffer; whatever the engine wrote is emitted after each step.
pub struct ZstdSession<E: ZstdEngine = NativeZstd> {
    engine: Option<E>,
    buffers: Option<BufferPair>,
    input: ZstdDescriptor,
    output: ZstdDescriptor,
    last_return: usize,
    phase: Phase,
    state: StreamState,
    stats: DecodeStats,
}

impl ZstdSession<NativeZstd> {
    /// Create a session with the library-recommended buffer sizes.
    pub fn new() -> Result<Self> {
        Self::with_engine(NativeZstd::new()?, NativeZstd::recommended_config())
    }

    /// Create a session with custom buffer sizes.
    pub fn with_config(config: StreamConfig) -> Result<Self> {
        Self::with_engine(NativeZstd::new()?, config)
    }
}

impl<E: ZstdEngine> ZstdSession<E> {
    /// Create a session around an existing engine.
    pub fn with_engine(engine: E, config: StreamConfig) -> Result<Self> {
        let buffers = BufferPair::allocate(&config)?;
        debug!(
            input = config.input_buffer_size,
            output = config.output_buffer_size,
            "zstd session started"
        );

        Ok(Self {
            engine: Some(engine),
            buffers: Some(buffers),
            input: ZstdDescriptor::default(),
            output: ZstdDescriptor::default(),
            last_return: 0,
            phase: Phase::NeedsMoreInput,
            state: StreamState::Initial,
            stats: DecodeStats::for_algorithm(Algorithm::Zstd),
        })
    }

    /// The engine's hint from the last step (`0` at a frame boundary).
    pub fn last_return(&self) -> usize {
        self.last_return
    }

    /// Phase derived from the last step.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Check if the engine and buffers are still held.
    pub fn holds_engine(&self) -> bool {
        self.engine.is_some()
    }

    fn pump(
        &mut self,
        chunk: &[u8],
        sink: &mut dyn ChunkSink,
    ) -> std::result::Result<(), EngineFault> {
        let Self {
            engine,
            buffers,
            input,
            output,
            last_return,
            phase,
            stats,
            ..
        } = self;
        let (Some(engine), Some(buffers)) = (engine.as_mut(), buffers.as_mut()) else {
            return Ok(());
        };

        let capacity = buffers.output.capacity();
        let mut offset = 0;

        while offset < chunk.len() {
            let loaded = buffers.input.load(&chunk[offset..]);
            offset += loaded;
            *input = ZstdDescriptor::new(loaded);

            loop {
                *output = ZstdDescriptor::new(capacity);
                let (in_buf, out_buf) = buffers.split();
                let hint = engine.decompress_stream(
                    out_buf.as_mut_slice(),
                    output,
                    in_buf.filled(),
                    input,
                )?;
                stats.engine_steps += 1;

                if output.pos > 0 {
                    let produced = Bytes::copy_from_slice(&out_buf.as_slice()[..output.pos]);
                    stats.record_output(produced.len());
                    sink.push(produced);
                }
                *last_return = hint;

                let output_full = output.is_exhausted();
                *phase = if output_full {
                    Phase::NeedsMoreOutput
                } else if hint == 0 {
                    Phase::Success
                } else {
                    Phase::NeedsMoreInput
                };

                if input.is_exhausted() && !output_full {
                    break;
                }
            }
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
        self.phase = Phase::Error;
        self.state = StreamState::Failed;
        debug!(
            bytes_in = self.stats.bytes_in,
            bytes_out = self.stats.bytes_out,
            category = err.category(),
            "zstd session failed"
        );
        err
    }
}

impl<E: ZstdEngine> StreamingDecompressor for ZstdSession<E> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zstd
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

        if let Err(fault) = self.pump(chunk, sink) {
            let err = Error::algorithm("zstd", format!("[{}] {}", fault.code, fault.name));
            return Err(self.fail(err));
        }
        Ok(())
    }

    fn flush(&mut self, _sink: &mut dyn ChunkSink) -> Result<()> {
        if !self.state.can_write() {
            return Err(Error::invalid_state("active", self.state.name()));
        }

        if self.last_return != 0 {
            let bytes_read = self.stats.bytes_in as usize;
            return Err(self.fail(Error::unexpected_eof(bytes_read)));
        }

        self.release();
        self.state = StreamState::Finished;
        debug!(
            bytes_in = self.stats.bytes_in,
            bytes_out = self.stats.bytes_out,
            steps = self.stats.engine_steps,
            "zstd session finished"
        );
        Ok(())
    }

    fn stats(&self) -> &DecodeStats {
        &self.stats
    }
}

impl<E: ZstdEngine> Drop for ZstdSession<E> {
    fn drop(&mut self) {
        if self.release() {
            debug!(
                bytes_in = self.stats.bytes_in,
                "released abandoned zstd session"
            );
        }
    }
}

impl<E: ZstdEngine> std::fmt::Debug for ZstdSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZstdSession")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("last_return", &self.last_return)
            .field("state", &self.state)
            .field("holds_engine", &self.engine.is_some())
            .finish()
    }
}
