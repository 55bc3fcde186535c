//! The environment a worker runs in

use async_trait::async_trait;
use url::{Origin, Url};

use crate::Result;

/// Kind of client a worker controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// A browsing context
    Window,
    /// A dedicated worker
    Worker,
    /// A shared worker
    SharedWorker,
}

/// A page or worker controlled by the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Client identifier
    pub id: String,
    /// Current URL of the client
    pub url: Url,
    /// Client kind
    pub kind: ClientKind,
}

impl Client {
    /// Create a window client
    pub fn window(id: impl Into<String>, url: Url) -> Self {
        Self {
            id: id.into(),
            url,
            kind: ClientKind::Window,
        }
    }
}

/// Operations the worker host provides
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Origin the worker is registered on
    fn origin(&self) -> Origin;

    /// Look up a client by id
    async fn client(&self, id: &str) -> Option<Client>;

    /// Activate this worker without waiting for old clients to close
    async fn skip_waiting(&self) -> Result<()>;

    /// Take control of every client in scope
    async fn claim_clients(&self) -> Result<()>;

    /// Every window client in scope
    async fn window_clients(&self) -> Result<Vec<Client>>;

    /// Navigate a client to a URL
    async fn navigate(&self, client_id: &str, url: &Url) -> Result<()>;

    /// Let the browser start navigation requests before the worker answers
    async fn enable_navigation_preload(&self) -> Result<()>;
}
