//! Statistics for decompression sessions.

use crate::types::Algorithm;

/// Counters kept by a decompression session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Algorithm used.
    pub algorithm: Option<Algorithm>,

    /// Compressed bytes received.
    pub bytes_in: u64,

    /// Decompressed bytes emitted.
    pub bytes_out: u64,

    /// Input chunks received (including empty ones).
    pub chunks_in: u64,

    /// Output chunks emitted.
    pub chunks_out: u64,

    /// Calls into the engine's streaming step.
    pub engine_steps: u64,
}

impl DecodeStats {
    /// Create empty stats for an algorithm.
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        DecodeStats {
            algorithm: Some(algorithm),
            ..Default::default()
        }
    }

    /// Record a received input chunk.
    pub fn record_input(&mut self, len: usize) {
        self.chunks_in += 1;
        self.bytes_in += len as u64;
    }

    /// Record an emitted output chunk.
    pub fn record_output(&mut self, len: usize) {
        self.chunks_out += 1;
        self.bytes_out += len as u64;
    }

    /// Expansion ratio (decompressed / compressed).
    pub fn expansion(&self) -> f64 {
        if self.bytes_in == 0 {
            return 0.0;
        }
        self.bytes_out as f64 / self.bytes_in as f64
    }

    /// Merge stats from another session.
    pub fn merge(&mut self, other: &DecodeStats) {
        self.bytes_in += other.bytes_in;
        self.bytes_out += other.bytes_out;
        self.chunks_in += other.chunks_in;
        self.chunks_out += other.chunks_out;
        self.engine_steps += other.engine_steps;
    }
}
