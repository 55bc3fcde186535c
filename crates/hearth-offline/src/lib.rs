//! Offline Cache Coordination for Hearth Web Exports
//!
//! The logic a web export's service worker runs so a game keeps working
//! without a network:
//!
//! - **Install**: fetch every file of the cache set, all or nothing
//! - **Activate**: drop older versions of the project's cache
//! - **Fetch routing**: cache first for navigations and known files, with
//!   an offline page when the network is gone
//! - **Cross-origin isolation**: add COEP/COOP headers to served responses
//! - **Messages**: `claim`, `clear` and `update` commands from pages
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      WorkerRuntime                        │
//! │        (loads service-worker-data.json, dispatches)       │
//! ├──────────────────────────────────────────────────────────┤
//! │                    CacheCoordinator                       │
//! │      install · activate · handle_fetch · handle_message   │
//! ├───────────────┬───────────────────┬──────────────────────┤
//! │ CacheStorage  │      Network      │      WorkerHost      │
//! │ (memory+disk) │ (HTTP with retry) │ (clients, preload)   │
//! └───────────────┴───────────────────┴──────────────────────┘
//! ```

mod cache;
mod config;
mod coordinator;
mod error;
mod host;
mod message;
mod network;
mod request;
mod runtime;

pub mod headers;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::{Cache, CacheStorage, MemoryCache, MemoryCacheStorage};
pub use config::{CacheSettings, RetryConfig, RetryStrategy, WorkerData, WORKER_DATA_PATH};
pub use coordinator::{is_cacheable, CacheCoordinator, WorkerServices};
pub use error::{OfflineError, Result};
pub use headers::{has_isolation_headers, with_isolation_headers};
pub use host::{Client, ClientKind, WorkerHost};
pub use message::{MessageEvent, UnknownCommand, WorkerCommand};
pub use network::{fetch_with_retry, HttpConfig, HttpNetwork, Network};
pub use request::{cache_key, FetchEvent, FetchOutcome, Request, RequestMode, Response};
pub use runtime::{load_worker_data, EventOutcome, LifecycleHandler, WorkerEvent, WorkerRuntime};

/// Prelude for common imports
pub mod prelude {
    pub use super::{
        CacheCoordinator, CacheStorage, FetchEvent, FetchOutcome, MessageEvent, Request, Response,
        Result, WorkerData, WorkerEvent, WorkerRuntime, WorkerServices,
    };
}
