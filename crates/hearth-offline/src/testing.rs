//! In-memory network and host for exercising the coordinator, and a
//! loopback HTTP server for exercising [`HttpNetwork`](crate::HttpNetwork)

use async_trait::async_trait;
use dashmap::DashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::{Origin, Url};

use crate::request::cache_key;
use crate::{Client, ClientKind, Network, OfflineError, Request, Response, Result, WorkerHost};

/// Network answering from a fixed table; unknown URLs get a 404
pub struct FakeNetwork {
    responses: DashMap<String, Response>,
    online: AtomicBool,
    calls: AtomicUsize,
    requests: Mutex<Vec<Url>>,
}

impl FakeNetwork {
    /// Online network with no responses
    pub fn new() -> Self {
        Self {
            responses: DashMap::new(),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Serve `response` for `url`
    pub fn insert(&self, url: &Url, response: Response) {
        self.responses.insert(cache_key(url), response);
    }

    /// Builder form of [`FakeNetwork::insert`]
    pub fn with_response(self, url: &Url, response: Response) -> Self {
        self.insert(url, response);
        self
    }

    /// Fail every fetch with a connection error while offline
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of fetches attempted
    pub fn request_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs fetched so far
    pub async fn requests(&self) -> Vec<Url> {
        self.requests.lock().await.clone()
    }
}

impl Default for FakeNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.url.clone());

        if !self.online.load(Ordering::SeqCst) {
            return Err(OfflineError::Connection("network unreachable".into()));
        }
        Ok(self
            .responses
            .get(&cache_key(&request.url))
            .map(|r| r.value().clone())
            .unwrap_or_else(|| Response::new(404, "")))
    }
}

/// Host recording every lifecycle call
pub struct FakeHost {
    origin: Origin,
    clients: DashMap<String, Client>,
    skip_waiting: AtomicUsize,
    claims: AtomicUsize,
    preload: AtomicBool,
    navigations: Mutex<Vec<(String, Url)>>,
}

impl FakeHost {
    /// Host for the origin of `scope`
    pub fn new(scope: &Url) -> Self {
        Self {
            origin: scope.origin(),
            clients: DashMap::new(),
            skip_waiting: AtomicUsize::new(0),
            claims: AtomicUsize::new(0),
            preload: AtomicBool::new(false),
            navigations: Mutex::new(Vec::new()),
        }
    }

    /// Register a client
    pub fn add_client(&self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    /// Builder form of [`FakeHost::add_client`]
    pub fn with_client(self, client: Client) -> Self {
        self.add_client(client);
        self
    }

    /// Calls to `skip_waiting`
    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Calls to `claim_clients`
    pub fn claim_calls(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    /// Whether navigation preload was enabled
    pub fn navigation_preload_enabled(&self) -> bool {
        self.preload.load(Ordering::SeqCst)
    }

    /// Client navigations in call order
    pub async fn navigations(&self) -> Vec<(String, Url)> {
        self.navigations.lock().await.clone()
    }
}

#[async_trait]
impl WorkerHost for FakeHost {
    fn origin(&self) -> Origin {
        self.origin.clone()
    }

    async fn client(&self, id: &str) -> Option<Client> {
        self.clients.get(id).map(|c| c.value().clone())
    }

    async fn skip_waiting(&self) -> Result<()> {
        self.skip_waiting.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<()> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn window_clients(&self) -> Result<Vec<Client>> {
        let mut windows: Vec<Client> = self
            .clients
            .iter()
            .filter(|c| c.kind == ClientKind::Window)
            .map(|c| c.value().clone())
            .collect();
        windows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(windows)
    }

    async fn navigate(&self, client_id: &str, url: &Url) -> Result<()> {
        if !self.clients.contains_key(client_id) {
            return Err(OfflineError::Host(format!("no client {client_id}")));
        }
        self.navigations
            .lock()
            .await
            .push((client_id.to_string(), url.clone()));
        Ok(())
    }

    async fn enable_navigation_preload(&self) -> Result<()> {
        self.preload.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// HTTP/1.1 server on a loopback port answering every request with one
/// fixed response and closing the connection
pub struct StubServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl StubServer {
    /// Start serving `status_line` (e.g. `"404 Not Found"`) with `body`
    pub async fn start(status_line: &str, body: &str) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let hits = Arc::new(AtomicUsize::new(0));
        let response: Arc<str> = format!(
            "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .into();

        let counter = hits.clone();
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(answer(socket, response.clone()));
            }
        });

        Ok(Self { addr, hits, task })
    }

    /// URL of `path` on this server
    pub fn url(&self, path: &str) -> std::result::Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}/", self.addr))?.join(path)
    }

    /// Connections accepted so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn answer(mut socket: TcpStream, response: Arc<str>) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}
