//! Error types for decompression sessions.

use thiserror::Error;

/// Result type alias for decompression operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Decompression error types.
///
/// Every engine-reported failure is terminal for the stream it came from.
#[derive(Debug, Error)]
pub enum Error {
    /// Input data is corrupted or invalid.
    #[error("corrupted data: {message}")]
    CorruptedData { message: String },

    /// The compressed stream ended before the frame was complete.
    #[error("unexpected EOF after {bytes_read} bytes")]
    UnexpectedEof { bytes_read: usize },

    /// The engine still wanted output space after all input was consumed.
    #[error("failed to write output: engine demanded more output after input was exhausted")]
    OutputStalled,

    /// Session buffer or engine allocation failed.
    #[error("allocation failed: could not allocate {requested_bytes} bytes")]
    AllocationFailed { requested_bytes: usize },

    /// Invalid session configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Algorithm-specific error.
    #[error("{algorithm} error: {message}")]
    Algorithm {
        algorithm: &'static str,
        message: String,
    },

    /// Stream state error.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// I/O error from an underlying reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Error::CorruptedData {
            message: message.into(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(bytes_read: usize) -> Self {
        Error::UnexpectedEof { bytes_read }
    }

    /// Create an algorithm-specific error.
    pub fn algorithm(algorithm: &'static str, message: impl Into<String>) -> Self {
        Error::Algorithm {
            algorithm,
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(expected: &'static str, actual: &'static str) -> Self {
        Error::InvalidState { expected, actual }
    }

    /// Whether the error ends the stream it was raised on.
    ///
    /// Only misuse of an already-closed session is non-terminal; the
    /// session itself is unaffected by a rejected call.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Error::InvalidState { .. })
    }

    /// Get error category for log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Error::CorruptedData { .. } => "corrupted_data",
            Error::UnexpectedEof { .. } => "unexpected_eof",
            Error::OutputStalled => "output_stalled",
            Error::AllocationFailed { .. } => "allocation_failed",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Algorithm { .. } => "algorithm_error",
            Error::InvalidState { .. } => "invalid_state",
            Error::Io(_) => "io_error",
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(inner) => inner,
            Error::UnexpectedEof { .. } => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e.to_string())
            }
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}
