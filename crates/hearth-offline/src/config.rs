//! Worker data and retry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{OfflineError, Result};

/// Resource the worker loads its configuration from, relative to its scope.
pub const WORKER_DATA_PATH: &str = "service-worker-data.json";

/// Cache settings from the worker data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    /// Name of the current cache version
    pub name: String,
    /// Prefix shared by every version of this project's cache
    pub prefix: String,
    /// Files added at install time, in order
    pub files: Vec<String>,
    /// Files cached on first fetch
    #[serde(default)]
    pub cacheable_files: Vec<String>,
}

/// Configuration a worker instance runs with.
///
/// Parsed from `service-worker-data.json`:
///
/// ```json
/// {
///   "cache": { "name": "game-v3", "prefix": "game-", "files": ["index.html"], "cacheableFiles": [] },
///   "offlineUrl": "index.offline.html",
///   "ensureCrossOriginIsolationHeaders": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerData {
    /// Cache settings
    pub cache: CacheSettings,
    /// Page served when navigation fails offline
    pub offline_url: String,
    /// Add COEP/COOP headers to responses
    #[serde(default)]
    pub ensure_cross_origin_isolation_headers: bool,
}

impl WorkerData {
    /// Parse and validate worker data from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let data: WorkerData = serde_json::from_str(text)?;
        data.validate()?;
        Ok(data)
    }

    /// Parse and validate worker data from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let data: WorkerData = serde_json::from_slice(bytes)?;
        data.validate()?;
        Ok(data)
    }

    /// Check the fields the coordinator relies on
    pub fn validate(&self) -> Result<()> {
        if self.cache.name.is_empty() {
            return Err(OfflineError::config("cache.name must not be empty"));
        }
        if self.cache.files.is_empty() {
            return Err(OfflineError::config("cache.files must list at least one file"));
        }
        Ok(())
    }

    /// Install files followed by cacheable files
    pub fn full_cache(&self) -> Vec<&str> {
        self.cache
            .files
            .iter()
            .chain(self.cache.cacheable_files.iter())
            .map(String::as_str)
            .collect()
    }

    /// Check if a cache name belongs to an older version of this project
    pub fn is_stale_cache(&self, name: &str) -> bool {
        name.starts_with(&self.cache.prefix) && name != self.cache.name
    }
}

/// How to space out retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum RetryStrategy {
    /// Double the delay after every failed attempt
    #[default]
    ExponentialBackoff,
    /// Retry without waiting
    Immediate,
}

/// Retry configuration for network fetches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Backoff strategy
    pub strategy: RetryStrategy,
    /// Maximum attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on the delay
    pub max_delay: Option<Duration>,
    /// When non-empty, only these statuses are retried
    pub status_allow_list: Vec<u16>,
    /// Statuses that are never retried
    pub status_deny_list: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::ExponentialBackoff,
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: None,
            status_allow_list: Vec::new(),
            status_deny_list: Vec::new(),
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Reject configurations that could never make a request
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(OfflineError::config("retry.maxAttempts cannot be 0"));
        }
        Ok(())
    }

    /// Check if a failed status may be retried
    pub fn should_retry_status(&self, status: u16) -> bool {
        if self.status_deny_list.contains(&status) {
            return false;
        }
        self.status_allow_list.is_empty() || self.status_allow_list.contains(&status)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.strategy {
            RetryStrategy::Immediate => Duration::ZERO,
            RetryStrategy::ExponentialBackoff => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                let delay = self.base_delay.saturating_mul(factor);
                match self.max_delay {
                    Some(max) => delay.min(max),
                    None => delay,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "cache": {
            "name": "game-v2",
            "prefix": "game-",
            "files": ["index.html", "index.js", "index.wasm"],
            "cacheableFiles": ["index.pck"]
        },
        "offlineUrl": "index.offline.html",
        "ensureCrossOriginIsolationHeaders": true
    }"#;

    #[test]
    fn test_parse_worker_data() {
        let data = WorkerData::from_json(SAMPLE).unwrap();
        assert_eq!(data.cache.name, "game-v2");
        assert_eq!(data.offline_url, "index.offline.html");
        assert!(data.ensure_cross_origin_isolation_headers);
        assert_eq!(
            data.full_cache(),
            vec!["index.html", "index.js", "index.wasm", "index.pck"]
        );
    }

    #[test]
    fn test_optional_fields_default() {
        let data = WorkerData::from_json(
            r#"{"cache":{"name":"a","prefix":"","files":["x"]},"offlineUrl":"o.html"}"#,
        )
        .unwrap();
        assert!(data.cache.cacheable_files.is_empty());
        assert!(!data.ensure_cross_origin_isolation_headers);
    }

    #[test]
    fn test_validation() {
        let err = WorkerData::from_json(
            r#"{"cache":{"name":"","prefix":"","files":["x"]},"offlineUrl":"o"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, OfflineError::Configuration(_)));

        let err = WorkerData::from_json(
            r#"{"cache":{"name":"a","prefix":"","files":[]},"offlineUrl":"o"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, OfflineError::Configuration(_)));

        assert!(matches!(
            WorkerData::from_json("{not json").unwrap_err(),
            OfflineError::Json(_)
        ));
    }

    #[test]
    fn test_stale_cache() {
        let data = WorkerData::from_json(SAMPLE).unwrap();
        assert!(data.is_stale_cache("game-v1"));
        assert!(!data.is_stale_cache("game-v2"));
        assert!(!data.is_stale_cache("other-v1"));
    }

    #[test]
    fn test_retry_delays() {
        let config = RetryConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Some(Duration::from_millis(350)),
            ..Default::default()
        };
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(350));

        let immediate = RetryConfig {
            strategy: RetryStrategy::Immediate,
            ..Default::default()
        };
        assert_eq!(immediate.delay_for(5), Duration::ZERO);
    }

    #[test]
    fn test_status_lists() {
        let mut config = RetryConfig::default();
        assert!(config.should_retry_status(503));

        config.status_deny_list = vec![503];
        assert!(!config.should_retry_status(503));

        config.status_allow_list = vec![502];
        assert!(config.should_retry_status(502));
        assert!(!config.should_retry_status(500));

        assert!(RetryConfig {
            max_attempts: 0,
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
