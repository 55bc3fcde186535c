//! Error types for offline cache coordination

use thiserror::Error;

/// Result type for offline operations
pub type Result<T> = std::result::Result<T, OfflineError>;

/// Errors that can occur while serving, caching or fetching
#[derive(Error, Debug)]
pub enum OfflineError {
    /// The server answered with a non-success status
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Network connection failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Nothing cached under the requested key
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cache storage error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Worker data or client configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// All retries exhausted
    #[error("All retries exhausted: {0}")]
    RetriesExhausted(String),

    /// Worker data was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker host rejected an operation
    #[error("Host error: {0}")]
    Host(String),
}

impl OfflineError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            OfflineError::Connection(_) => true,
            OfflineError::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        OfflineError::Configuration(message.into())
    }

    /// Create a cache error
    pub fn cache(message: impl Into<String>) -> Self {
        OfflineError::Cache(message.into())
    }
}

impl From<reqwest::Error> for OfflineError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            OfflineError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else if e.is_builder() {
            OfflineError::InvalidUrl(e.to_string())
        } else {
            OfflineError::Connection(e.to_string())
        }
    }
}

impl From<url::ParseError> for OfflineError {
    fn from(e: url::ParseError) -> Self {
        OfflineError::InvalidUrl(e.to_string())
    }
}

impl From<bincode::Error> for OfflineError {
    fn from(e: bincode::Error) -> Self {
        OfflineError::Cache(e.to_string())
    }
}
