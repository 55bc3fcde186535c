//! Streaming decompression phases, session state and buffer configuration.

/// Brotli legacy path buffer capacity (1 MiB).
pub const LEGACY_BUFFER_SIZE: usize = 1 << 20;

/// Brotli buffer-pair path capacity (512 KiB).
pub const PAIRED_BUFFER_SIZE: usize = 512 * 1024;

/// The engine's demand after a decompression step.
///
/// Recomputed after every call into the engine; it alone decides what the
/// session does next with its buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// All available input was consumed; refill the input buffer.
    #[default]
    NeedsMoreInput,
    /// The output buffer is full; drain it before stepping again.
    NeedsMoreOutput,
    /// The compressed stream ended cleanly.
    Success,
    /// The engine rejected the input.
    Error,
}

impl Phase {
    /// Map a raw engine result code (0 = error, 1 = success,
    /// 2 = needs more input, 3 = needs more output).
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Phase::Success,
            2 => Phase::NeedsMoreInput,
            3 => Phase::NeedsMoreOutput,
            _ => Phase::Error,
        }
    }

    /// Raw engine result code for this phase.
    pub fn code(self) -> i32 {
        match self {
            Phase::Error => 0,
            Phase::Success => 1,
            Phase::NeedsMoreInput => 2,
            Phase::NeedsMoreOutput => 3,
        }
    }

    /// Check if no further engine step can change the outcome.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Success | Phase::Error)
    }
}

/// Configuration for session buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Input buffer capacity.
    pub input_buffer_size: usize,

    /// Output buffer capacity.
    pub output_buffer_size: usize,
}

impl StreamConfig {
    /// Both buffers with the same capacity.
    pub fn symmetric(size: usize) -> Self {
        StreamConfig {
            input_buffer_size: size,
            output_buffer_size: size,
        }
    }

    /// Brotli legacy path: two 1 MiB buffers.
    pub fn legacy() -> Self {
        Self::symmetric(LEGACY_BUFFER_SIZE)
    }

    /// Brotli buffer-pair path: two 512 KiB buffers.
    pub fn paired() -> Self {
        Self::symmetric(PAIRED_BUFFER_SIZE)
    }

    /// Reject zero-capacity buffers.
    pub fn validate(&self) -> crate::Result<()> {
        if self.input_buffer_size == 0 || self.output_buffer_size == 0 {
            return Err(crate::Error::InvalidConfig(format!(
                "buffer sizes must be non-zero (input {}, output {})",
                self.input_buffer_size, self.output_buffer_size
            )));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::legacy()
    }
}

/// Lifecycle of a decompression session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// No chunk received yet.
    #[default]
    Initial,
    /// At least one chunk received, not flushed.
    Active,
    /// Flushed successfully; engine released.
    Finished,
    /// Terminal error reported; engine released.
    Failed,
}

impl StreamState {
    /// Check if stream is in a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Finished | StreamState::Failed)
    }

    /// Check if stream can accept more input.
    pub fn can_write(self) -> bool {
        matches!(self, StreamState::Initial | StreamState::Active)
    }

    /// Name used in state errors and logs.
    pub fn name(self) -> &'static str {
        match self {
            StreamState::Initial => "initial",
            StreamState::Active => "active",
            StreamState::Finished => "finished",
            StreamState::Failed => "failed",
        }
    }
}
