//! The Brotli engine seam.
//!
//! A session never talks to the decoder directly; it goes through
//! [`BrotliEngine`], which mirrors the C streaming API: one step over five
//! cursor fields, returning the engine's next demand.

use brotli::enc::StandardAlloc;
use brotli::{BrotliResult, BrotliState};
use hearth_core::Phase;

/// Cursor fields threaded through every engine step.
///
/// `next_in`/`next_out` are offsets into the session's input and output
/// buffers; `available_in`/`available_out` count the bytes left to read and
/// to write from those offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrotliCursor {
    pub available_in: usize,
    pub next_in: usize,
    pub available_out: usize,
    pub next_out: usize,
    pub total_out: usize,
}

impl BrotliCursor {
    /// Cursor for a fresh session with an empty output buffer of `capacity`.
    pub fn start(capacity: usize) -> Self {
        Self {
            available_out: capacity,
            ..Default::default()
        }
    }

    /// Point the input side at `len` freshly loaded bytes.
    pub fn refill(&mut self, len: usize) {
        self.available_in = len;
        self.next_in = 0;
    }

    /// Mark the output buffer as drained.
    pub fn drain(&mut self, capacity: usize) {
        self.available_out = capacity;
        self.next_out = 0;
    }
}

/// A streaming Brotli decoder instance.
///
/// Dropping the engine releases every resource it holds.
pub trait BrotliEngine {
    /// Run one streaming step.
    ///
    /// Reads from `input[cursor.next_in..cursor.next_in + cursor.available_in]`
    /// and writes to `output[cursor.next_out..]`, advancing the cursor.
    fn decompress_stream(
        &mut self,
        cursor: &mut BrotliCursor,
        input: &[u8],
        output: &mut [u8],
    ) -> Phase;
}

/// The `brotli` crate's decoder state.
pub struct NativeBrotli {
    state: BrotliState<StandardAlloc, StandardAlloc, StandardAlloc>,
}

impl NativeBrotli {
    /// Create a new decoder instance.
    pub fn new() -> Self {
        Self {
            state: BrotliState::new(
                StandardAlloc::default(),
                StandardAlloc::default(),
                StandardAlloc::default(),
            ),
        }
    }
}

impl Default for NativeBrotli {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NativeBrotli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBrotli").finish_non_exhaustive()
    }
}

impl BrotliEngine for NativeBrotli {
    fn decompress_stream(
        &mut self,
        cursor: &mut BrotliCursor,
        input: &[u8],
        output: &mut [u8],
    ) -> Phase {
        let result = brotli::BrotliDecompressStream(
            &mut cursor.available_in,
            &mut cursor.next_in,
            input,
            &mut cursor.available_out,
            &mut cursor.next_out,
            output,
            &mut cursor.total_out,
            &mut self.state,
        );

        match result {
            BrotliResult::ResultSuccess => Phase::Success,
            BrotliResult::NeedsMoreInput => Phase::NeedsMoreInput,
            BrotliResult::NeedsMoreOutput => Phase::NeedsMoreOutput,
            BrotliResult::ResultFailure => Phase::Error,
        }
    }
}
