//! Versioned response caches with optional disk persistence

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::request::cache_key;
use crate::{OfflineError, Response, Result};

/// Snapshot file written by [`MemoryCacheStorage::sync`].
const SNAPSHOT_FILE: &str = "caches.bin";

/// One named cache of request URL to response
#[async_trait]
pub trait Cache: Send + Sync {
    /// Name this cache was opened under
    fn name(&self) -> &str;

    /// Look up the response stored for a URL
    async fn match_url(&self, url: &Url) -> Result<Option<Response>>;

    /// Store a response, replacing any previous one
    async fn put(&self, url: &Url, response: Response) -> Result<()>;

    /// Store several responses at once
    async fn put_all(&self, entries: Vec<(Url, Response)>) -> Result<()>;

    /// Remove the response stored for a URL
    async fn delete(&self, url: &Url) -> Result<bool>;

    /// URLs with a stored response
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Storage of named caches
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a cache, creating it when missing
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>>;

    /// Check if a cache exists
    async fn has(&self, name: &str) -> Result<bool>;

    /// Delete a cache; returns whether it existed
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Cache names in creation order
    async fn keys(&self) -> Result<Vec<String>>;

    /// Look up a URL across every cache, oldest cache first
    async fn match_any(&self, url: &Url) -> Result<Option<Response>>;

    /// Make every change so far survive a restart
    async fn persist(&self) -> Result<()> {
        Ok(())
    }
}

/// In-memory cache
pub struct MemoryCache {
    name: String,
    created: u64,
    entries: DashMap<String, Response>,
}

impl MemoryCache {
    fn new(name: &str, created: u64) -> Self {
        Self {
            name: name.to_string(),
            created,
            entries: DashMap::new(),
        }
    }

    /// Number of stored responses
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_url(&self, url: &Url) -> Result<Option<Response>> {
        Ok(self
            .entries
            .get(&cache_key(url))
            .map(|e| e.value().clone()))
    }

    async fn put(&self, url: &Url, response: Response) -> Result<()> {
        self.entries.insert(cache_key(url), response);
        Ok(())
    }

    async fn put_all(&self, entries: Vec<(Url, Response)>) -> Result<()> {
        for (url, response) in entries {
            self.entries.insert(cache_key(&url), response);
        }
        Ok(())
    }

    async fn delete(&self, url: &Url) -> Result<bool> {
        Ok(self.entries.remove(&cache_key(url)).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}

/// Cache storage held in memory, optionally persisted to a directory
pub struct MemoryCacheStorage {
    caches: DashMap<String, Arc<MemoryCache>>,
    next_seq: AtomicU64,
    dir: Option<PathBuf>,
    // One snapshot write at a time
    sync_lock: Mutex<()>,
}

impl MemoryCacheStorage {
    /// Create an empty, non-persistent storage
    pub fn new() -> Self {
        Self {
            caches: DashMap::new(),
            next_seq: AtomicU64::new(0),
            dir: None,
            sync_lock: Mutex::new(()),
        }
    }

    /// Create or open a storage persisted under `dir`
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;

        let storage = Self {
            dir: Some(dir),
            ..Self::new()
        };
        storage.load_snapshot().await?;
        Ok(storage)
    }

    /// Directory this storage persists to, if any
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Write all caches to disk
    pub async fn sync(&self) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let _guard = self.sync_lock.lock().await;

        let snapshot = self.snapshot();
        let data = bincode::serialize(&snapshot)?;

        let path = dir.join(SNAPSHOT_FILE);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, &data).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!(
            "Synced {} caches ({} bytes) to {}",
            snapshot.len(),
            data.len(),
            path.display()
        );
        Ok(())
    }

    fn ordered(&self) -> Vec<Arc<MemoryCache>> {
        let mut caches: Vec<Arc<MemoryCache>> =
            self.caches.iter().map(|e| e.value().clone()).collect();
        caches.sort_by_key(|c| c.created);
        caches
    }

    fn snapshot(&self) -> Vec<CacheSnapshot> {
        self.ordered()
            .iter()
            .map(|cache| {
                let mut entries: Vec<EntrySnapshot> = cache
                    .entries
                    .iter()
                    .map(|e| EntrySnapshot::capture(e.key(), e.value()))
                    .collect();
                entries.sort_by(|a, b| a.url.cmp(&b.url));
                CacheSnapshot {
                    name: cache.name.clone(),
                    entries,
                }
            })
            .collect()
    }

    async fn load_snapshot(&self) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let path = dir.join(SNAPSHOT_FILE);
        if !fs::try_exists(&path).await? {
            return Ok(());
        }

        let data = fs::read(&path).await?;
        let snapshot: Vec<CacheSnapshot> = bincode::deserialize(&data)?;

        let mut total = 0usize;
        for cache in snapshot {
            let memory = self.create(&cache.name);
            for entry in cache.entries {
                match entry.restore() {
                    Ok((url, response)) => {
                        memory.entries.insert(url, response);
                        total += 1;
                    }
                    Err(e) => warn!("Dropping unreadable cache entry: {}", e),
                }
            }
        }

        info!(
            "Loaded cache snapshot: {} caches, {} entries",
            self.caches.len(),
            total
        );
        Ok(())
    }

    fn create(&self, name: &str) -> Arc<MemoryCache> {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                Arc::new(MemoryCache::new(name, seq))
            })
            .value()
            .clone()
    }
}

impl Default for MemoryCacheStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        let cache: Arc<dyn Cache> = self.create(name);
        Ok(cache)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.caches.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let removed = self.caches.remove(name).is_some();
        if removed {
            debug!("Deleted cache {}", name);
        }
        Ok(removed)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.ordered().iter().map(|c| c.name.clone()).collect())
    }

    async fn match_any(&self, url: &Url) -> Result<Option<Response>> {
        for cache in self.ordered() {
            if let Some(hit) = cache.match_url(url).await? {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    async fn persist(&self) -> Result<()> {
        self.sync().await
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheSnapshot {
    name: String,
    entries: Vec<EntrySnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntrySnapshot {
    url: String,
    status: u16,
    status_text: String,
    headers: Vec<(String, Vec<u8>)>,
    body: Vec<u8>,
}

impl EntrySnapshot {
    fn capture(url: &str, response: &Response) -> Self {
        Self {
            url: url.to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response
                .headers
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), v.as_bytes().to_vec()))
                .collect(),
            body: response.body.to_vec(),
        }
    }

    fn restore(self) -> Result<(String, Response)> {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| OfflineError::cache(e.to_string()))?;
            let value =
                HeaderValue::from_bytes(&value).map_err(|e| OfflineError::cache(e.to_string()))?;
            headers.append(name, value);
        }
        Ok((
            self.url,
            Response {
                status: self.status,
                status_text: self.status_text,
                headers,
                body: Bytes::from(self.body),
            },
        ))
    }
}
