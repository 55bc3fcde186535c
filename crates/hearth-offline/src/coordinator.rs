//! Install, activate, fetch and message handling for the offline cache

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::headers::with_isolation_headers;
use crate::{
    Cache, CacheStorage, FetchEvent, FetchOutcome, MessageEvent, Network, OfflineError, Request,
    Response, Result, WorkerCommand, WorkerData, WorkerHost,
};

/// Everything a coordinator talks to
#[derive(Clone)]
pub struct WorkerServices {
    /// Registration scope; relative cache paths resolve against it
    pub scope: Url,
    /// Cache storage
    pub caches: Arc<dyn CacheStorage>,
    /// Network
    pub network: Arc<dyn Network>,
    /// Worker host
    pub host: Arc<dyn WorkerHost>,
}

/// Decide whether a request targets a file of the cache set.
///
/// `base` is the referrer up to and including its last `/`; `local` is the
/// request URL with `base` stripped, or empty when the URL does not start
/// with `base`. The request is cacheable when `local` names a file of the
/// full cache set, or when the referrer ends in `/` and also ends with the
/// first install file.
pub fn is_cacheable(data: &WorkerData, url: &str, referrer: &str) -> bool {
    let base = match referrer.rfind('/') {
        Some(i) => &referrer[..=i],
        None => "",
    };
    let local = url.strip_prefix(base).unwrap_or("");

    if data.full_cache().contains(&local) {
        return true;
    }
    base == referrer
        && data
            .cache
            .files
            .first()
            .is_some_and(|first| base.ends_with(first.as_str()))
}

/// Offline cache coordinator for one worker instance
pub struct CacheCoordinator {
    data: WorkerData,
    services: WorkerServices,
}

impl CacheCoordinator {
    /// Create a coordinator
    pub fn new(data: WorkerData, services: WorkerServices) -> Self {
        Self { data, services }
    }

    /// Worker data in use
    pub fn data(&self) -> &WorkerData {
        &self.data
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        Ok(self.services.scope.join(path)?)
    }

    /// Populate the current cache with every install file.
    ///
    /// All files are fetched before anything is stored; if one fetch fails
    /// or answers with a non-success status, the cache is left untouched.
    pub async fn install(&self) -> Result<()> {
        let cache = self.services.caches.open(&self.data.cache.name).await?;

        let urls = self
            .data
            .cache
            .files
            .iter()
            .map(|f| self.resolve(f))
            .collect::<Result<Vec<_>>>()?;

        let network = &self.services.network;
        let entries = try_join_all(urls.into_iter().map(|url| async move {
            let response = network.fetch(&Request::new(url.clone())).await?;
            if !response.is_ok() {
                return Err(OfflineError::Http {
                    status: response.status,
                    message: format!("install fetch of {url} failed"),
                });
            }
            Ok::<_, OfflineError>((url, response))
        }))
        .await?;

        let count = entries.len();
        cache.put_all(entries).await?;
        self.services.caches.persist().await?;
        info!("Installed cache {} with {} files", self.data.cache.name, count);
        Ok(())
    }

    /// Delete stale versions of this project's cache, then enable
    /// navigation preload. Returns the deleted cache names.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let caches = &self.services.caches;
        let stale: Vec<String> = caches
            .keys()
            .await?
            .into_iter()
            .filter(|name| self.data.is_stale_cache(name))
            .collect();

        try_join_all(stale.iter().map(|name| caches.delete(name))).await?;
        if !stale.is_empty() {
            caches.persist().await?;
        }
        self.services.host.enable_navigation_preload().await?;

        info!(
            "Activated cache {} ({} stale caches removed)",
            self.data.cache.name,
            stale.len()
        );
        Ok(stale)
    }

    /// Route a fetch to the cache, the network, or neither
    pub async fn handle_fetch(&self, event: FetchEvent) -> Result<FetchOutcome> {
        let is_navigate = event.request.is_navigate();
        let cacheable = is_cacheable(
            &self.data,
            event.request.url.as_str(),
            &event.request.referrer,
        );

        if is_navigate || cacheable {
            self.respond_from_cache(event, is_navigate, cacheable).await
        } else if self.data.ensure_cross_origin_isolation_headers {
            let response = self.services.network.fetch(&event.request).await?;
            Ok(FetchOutcome::Respond(with_isolation_headers(response)))
        } else {
            Ok(FetchOutcome::Passthrough)
        }
    }

    async fn respond_from_cache(
        &self,
        mut event: FetchEvent,
        is_navigate: bool,
        cacheable: bool,
    ) -> Result<FetchOutcome> {
        let cache = self.services.caches.open(&self.data.cache.name).await?;

        if is_navigate && self.is_missing_files(cache.as_ref()).await? {
            return match self.fetch_and_cache(&mut event, cache.as_ref(), cacheable).await {
                Ok(response) => Ok(FetchOutcome::Respond(response)),
                Err(e) => {
                    warn!("Network error: {}", e);
                    let offline = self.resolve(&self.data.offline_url)?;
                    match self.services.caches.match_any(&offline).await? {
                        Some(page) => {
                            warn!("Serving offline page {}", offline);
                            Ok(FetchOutcome::Respond(page))
                        }
                        None => Ok(FetchOutcome::Passthrough),
                    }
                }
            };
        }

        if let Some(cached) = cache.match_url(&event.request.url).await? {
            debug!("Cache hit: {}", event.request.url);
            return Ok(FetchOutcome::Respond(self.maybe_isolate(cached)));
        }

        let response = self
            .fetch_and_cache(&mut event, cache.as_ref(), cacheable)
            .await?;
        Ok(FetchOutcome::Respond(response))
    }

    async fn is_missing_files(&self, cache: &dyn Cache) -> Result<bool> {
        let urls = self
            .data
            .full_cache()
            .into_iter()
            .map(|f| self.resolve(f))
            .collect::<Result<Vec<_>>>()?;
        let hits = try_join_all(urls.iter().map(|url| cache.match_url(url))).await?;
        Ok(hits.iter().any(Option::is_none))
    }

    /// Answer from the preloaded response or the network, storing a copy
    /// when the request is cacheable.
    async fn fetch_and_cache(
        &self,
        event: &mut FetchEvent,
        cache: &dyn Cache,
        cacheable: bool,
    ) -> Result<Response> {
        let response = match event.preload_response.take() {
            Some(preloaded) => preloaded,
            None => self.services.network.fetch(&event.request).await?,
        };
        let response = self.maybe_isolate(response);

        if cacheable {
            let stored = match cache.put(&event.request.url, response.clone()).await {
                Ok(()) => self.services.caches.persist().await,
                Err(e) => Err(e),
            };
            if let Err(e) = stored {
                warn!("Failed to cache {}: {}", event.request.url, e);
            }
        }
        Ok(response)
    }

    fn maybe_isolate(&self, response: Response) -> Response {
        if self.data.ensure_cross_origin_isolation_headers {
            with_isolation_headers(response)
        } else {
            response
        }
    }

    /// Run a command posted by a controlled page.
    ///
    /// Messages from another origin, from unknown clients, or with an
    /// unknown payload are ignored and yield `None`.
    pub async fn handle_message(&self, event: MessageEvent) -> Result<Option<WorkerCommand>> {
        let host = &self.services.host;

        if event.origin != host.origin().ascii_serialization() {
            debug!("Ignoring message from foreign origin {}", event.origin);
            return Ok(None);
        }

        let id = event.source.as_deref().unwrap_or_default();
        if host.client(id).await.is_none() {
            debug!("Ignoring message from unknown client {:?}", id);
            return Ok(None);
        }

        let command = match event.data.parse::<WorkerCommand>() {
            Ok(command) => command,
            Err(e) => {
                debug!("Ignoring message: {}", e);
                return Ok(None);
            }
        };

        match command {
            WorkerCommand::Claim => {
                host.skip_waiting().await?;
                host.claim_clients().await?;
            }
            WorkerCommand::Clear => {
                let removed = self.services.caches.delete(&self.data.cache.name).await?;
                self.services.caches.persist().await?;
                info!("Cleared cache {} (existed: {})", self.data.cache.name, removed);
            }
            WorkerCommand::Update => {
                host.skip_waiting().await?;
                host.claim_clients().await?;
                for client in host.window_clients().await? {
                    if let Err(e) = host.navigate(&client.id, &client.url).await {
                        warn!("Failed to reload client {}: {}", client.id, e);
                    }
                }
            }
        }

        debug!("Handled {} command", command);
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeHost, FakeNetwork, StubServer};
    use crate::{Client, HttpConfig, HttpNetwork, MemoryCacheStorage};

    const SCOPE: &str = "https://game.example/play/";

    fn worker_data(ensure_headers: bool) -> WorkerData {
        WorkerData::from_json(&format!(
            r#"{{
                "cache": {{
                    "name": "game-v2",
                    "prefix": "game-",
                    "files": ["index.html", "app.js"],
                    "cacheableFiles": []
                }},
                "offlineUrl": "offline.html",
                "ensureCrossOriginIsolationHeaders": {ensure_headers}
            }}"#
        ))
        .unwrap()
    }

    fn url(path: &str) -> Url {
        Url::parse(SCOPE).unwrap().join(path).unwrap()
    }

    struct Harness {
        coordinator: CacheCoordinator,
        caches: Arc<MemoryCacheStorage>,
        network: Arc<FakeNetwork>,
        host: Arc<FakeHost>,
    }

    fn harness(data: WorkerData) -> Harness {
        harness_with(data, Arc::new(MemoryCacheStorage::new()))
    }

    fn harness_with(data: WorkerData, caches: Arc<MemoryCacheStorage>) -> Harness {
        let scope = Url::parse(SCOPE).unwrap();
        let network = Arc::new(FakeNetwork::new());
        let host =
            Arc::new(FakeHost::new(&scope).with_client(Client::window("c1", url("index.html"))));
        let services = WorkerServices {
            scope,
            caches: caches.clone(),
            network: network.clone(),
            host: host.clone(),
        };
        Harness {
            coordinator: CacheCoordinator::new(data, services),
            caches,
            network,
            host,
        }
    }

    async fn seed(h: &Harness, cache: &str, paths: &[&str]) {
        let cache = h.caches.open(cache).await.unwrap();
        for path in paths {
            cache
                .put(&url(path), Response::ok(format!("cached {path}")))
                .await
                .unwrap();
        }
    }

    #[test]
    fn test_is_cacheable() {
        let data = WorkerData::from_json(
            r#"{"cache":{"name":"g","prefix":"g","files":["index.html","index.js"],
                "cacheableFiles":["index.pck"]},"offlineUrl":"offline.html"}"#,
        )
        .unwrap();
        let referrer = "https://game.example/play/index.html";

        assert!(is_cacheable(&data, "https://game.example/play/index.js", referrer));
        assert!(is_cacheable(&data, "https://game.example/play/index.pck", referrer));
        assert!(!is_cacheable(&data, "https://game.example/play/other.js", referrer));
        assert!(!is_cacheable(&data, "https://cdn.example/index.js", referrer));
        assert!(!is_cacheable(&data, "https://game.example/play/index.js", ""));
    }

    #[test]
    fn test_is_cacheable_directory_referrer() {
        let data = WorkerData::from_json(
            r#"{"cache":{"name":"g","prefix":"g","files":["play/"]},"offlineUrl":"o"}"#,
        )
        .unwrap();
        assert!(is_cacheable(
            &data,
            "https://game.example/unrelated.css",
            "https://game.example/play/"
        ));
        assert!(!is_cacheable(
            &data,
            "https://game.example/unrelated.css",
            "https://game.example/play/index.html"
        ));
    }

    #[tokio::test]
    async fn test_navigation_served_from_cache_without_network() {
        let h = harness(worker_data(false));
        seed(&h, "game-v2", &["index.html", "app.js"]).await;

        let event = FetchEvent::new(Request::navigate(url("index.html")));
        let outcome = h.coordinator.handle_fetch(event).await.unwrap();

        let response = outcome.response().unwrap();
        assert_eq!(response.body.as_ref(), b"cached index.html");
        assert_eq!(h.network.request_count(), 0);
    }

    #[tokio::test]
    async fn test_navigation_offline_fallback() {
        let h = harness(worker_data(false));
        seed(&h, "game-v2", &["index.html", "offline.html"]).await;
        h.network.set_online(false);

        let event = FetchEvent::new(Request::navigate(url("index.html")));
        let outcome = h.coordinator.handle_fetch(event).await.unwrap();

        assert_eq!(
            outcome.response().unwrap().body.as_ref(),
            b"cached offline.html"
        );
        assert_eq!(h.network.request_count(), 1);
    }

    #[tokio::test]
    async fn test_offline_page_found_in_any_cache() {
        let h = harness(worker_data(false));
        seed(&h, "game-v1", &["offline.html"]).await;
        h.network.set_online(false);

        let event = FetchEvent::new(Request::navigate(url("index.html")));
        let outcome = h.coordinator.handle_fetch(event).await.unwrap();
        assert!(outcome.response().is_some());
    }

    #[tokio::test]
    async fn test_navigation_declines_without_offline_page() {
        let h = harness(worker_data(false));
        h.network.set_online(false);

        let event = FetchEvent::new(Request::navigate(url("index.html")));
        let outcome = h.coordinator.handle_fetch(event).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Passthrough);
    }

    #[tokio::test]
    async fn test_navigation_uses_preload_response() {
        let h = harness(worker_data(true));
        let event = FetchEvent::new(Request::navigate(url("index.html")))
            .with_preload(Response::ok("preloaded"));

        let outcome = h.coordinator.handle_fetch(event).await.unwrap();
        let response = outcome.response().unwrap();
        assert_eq!(response.body.as_ref(), b"preloaded");
        assert_eq!(response.header("cross-origin-opener-policy"), Some("same-origin"));
        assert_eq!(h.network.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cacheable_fetch_is_stored_then_served() {
        let h = harness(worker_data(false));
        h.network.insert(&url("app.js"), Response::ok("console.log(1)"));

        let request = Request::new(url("app.js")).with_referrer(url("index.html").as_str());
        let first = h
            .coordinator
            .handle_fetch(FetchEvent::new(request.clone()))
            .await
            .unwrap();
        assert_eq!(first.response().unwrap().body.as_ref(), b"console.log(1)");

        h.network.set_online(false);
        let second = h
            .coordinator
            .handle_fetch(FetchEvent::new(request))
            .await
            .unwrap();
        assert_eq!(second, first);
        assert_eq!(h.network.request_count(), 1);
    }

    #[tokio::test]
    async fn test_cached_response_is_wrapped() {
        let h = harness(worker_data(true));
        seed(&h, "game-v2", &["index.html", "app.js"]).await;

        let request = Request::new(url("app.js")).with_referrer(url("index.html").as_str());
        let outcome = h
            .coordinator
            .handle_fetch(FetchEvent::new(request))
            .await
            .unwrap();
        let response = outcome.response().unwrap();
        assert_eq!(response.header("cross-origin-embedder-policy"), Some("require-corp"));
        assert_eq!(response.body.as_ref(), b"cached app.js");
    }

    #[tokio::test]
    async fn test_cacheable_fetch_error_propagates() {
        let h = harness(worker_data(false));
        h.network.set_online(false);

        let request = Request::new(url("app.js")).with_referrer(url("index.html").as_str());
        let err = h
            .coordinator
            .handle_fetch(FetchEvent::new(request))
            .await
            .unwrap_err();
        assert!(matches!(err, OfflineError::Connection(_)));
    }

    #[tokio::test]
    async fn test_other_requests() {
        let h = harness(worker_data(false));
        let request = Request::parse("https://cdn.example/font.woff2").unwrap();
        let outcome = h
            .coordinator
            .handle_fetch(FetchEvent::new(request.clone()))
            .await
            .unwrap();
        assert_eq!(outcome, FetchOutcome::Passthrough);
        assert_eq!(h.network.request_count(), 0);

        let h = harness(worker_data(true));
        h.network.insert(&request.url, Response::ok("font"));
        let outcome = h
            .coordinator
            .handle_fetch(FetchEvent::new(request))
            .await
            .unwrap();
        let response = outcome.response().unwrap();
        assert_eq!(response.body.as_ref(), b"font");
        assert_eq!(response.header("cross-origin-opener-policy"), Some("same-origin"));
        assert!(!h.caches.has("game-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_isolated_fetch_keeps_error_status() {
        let server = StubServer::start("404 Not Found", "no such font").await.unwrap();
        let scope = Url::parse(SCOPE).unwrap();
        let services = WorkerServices {
            host: Arc::new(FakeHost::new(&scope)),
            scope,
            caches: Arc::new(MemoryCacheStorage::new()),
            network: Arc::new(HttpNetwork::new(HttpConfig::default()).unwrap()),
        };
        let coordinator = CacheCoordinator::new(worker_data(true), services);

        let request = Request::new(server.url("font.woff2").unwrap());
        let outcome = coordinator
            .handle_fetch(FetchEvent::new(request))
            .await
            .unwrap();

        let response = outcome.response().unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body.as_ref(), b"no such font");
        assert_eq!(response.header("cross-origin-embedder-policy"), Some("require-corp"));
        assert_eq!(response.header("cross-origin-opener-policy"), Some("same-origin"));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_navigation_error_status_is_not_offline() {
        let h = harness(worker_data(false));
        seed(&h, "game-v2", &["offline.html"]).await;

        let event = FetchEvent::new(Request::navigate(url("index.html")));
        let outcome = h.coordinator.handle_fetch(event).await.unwrap();

        let response = outcome.response().unwrap();
        assert_eq!(response.status, 404);
        assert_ne!(response.body.as_ref(), b"cached offline.html");
    }

    #[tokio::test]
    async fn test_fetch_and_clear_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let caches = Arc::new(MemoryCacheStorage::open(dir.path()).await.unwrap());
        let h = harness_with(worker_data(false), caches);
        h.network.insert(&url("app.js"), Response::ok("js"));

        let request = Request::new(url("app.js")).with_referrer(url("index.html").as_str());
        h.coordinator
            .handle_fetch(FetchEvent::new(request))
            .await
            .unwrap();

        let reopened = MemoryCacheStorage::open(dir.path()).await.unwrap();
        let cache = reopened.open("game-v2").await.unwrap();
        assert!(cache.match_url(&url("app.js")).await.unwrap().is_some());

        let event = MessageEvent::new("https://game.example", "c1", "clear");
        h.coordinator.handle_message(event).await.unwrap();

        let reopened = MemoryCacheStorage::open(dir.path()).await.unwrap();
        assert!(!reopened.has("game-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_install_stores_all_files() {
        let h = harness(worker_data(false));
        h.network.insert(&url("index.html"), Response::ok("<html>"));
        h.network.insert(&url("app.js"), Response::ok("js"));

        h.coordinator.install().await.unwrap();

        let cache = h.caches.open("game-v2").await.unwrap();
        assert_eq!(cache.keys().await.unwrap().len(), 2);
        assert!(cache.match_url(&url("app.js")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let h = harness(worker_data(false));
        h.network.insert(&url("index.html"), Response::ok("<html>"));

        let err = h.coordinator.install().await.unwrap_err();
        assert!(matches!(err, OfflineError::Http { status: 404, .. }));

        let cache = h.caches.open("game-v2").await.unwrap();
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_removes_stale_caches() {
        let h = harness(worker_data(false));
        seed(&h, "game-v1", &["index.html"]).await;
        seed(&h, "game-v2", &["index.html"]).await;
        seed(&h, "editor-v1", &["index.html"]).await;

        let removed = h.coordinator.activate().await.unwrap();

        assert_eq!(removed, vec!["game-v1"]);
        assert_eq!(h.caches.keys().await.unwrap(), vec!["game-v2", "editor-v1"]);
        assert!(h.host.navigation_preload_enabled());
    }

    #[tokio::test]
    async fn test_clear_message_removes_current_cache_only() {
        let h = harness(worker_data(false));
        seed(&h, "game-v2", &["index.html"]).await;
        seed(&h, "other", &["index.html"]).await;

        let event = MessageEvent::new("https://game.example", "c1", "clear");
        let handled = h.coordinator.handle_message(event).await.unwrap();

        assert_eq!(handled, Some(WorkerCommand::Clear));
        assert_eq!(h.caches.keys().await.unwrap(), vec!["other"]);
    }

    #[tokio::test]
    async fn test_claim_and_update_messages() {
        let h = harness(worker_data(false));

        let claim = MessageEvent::new("https://game.example", "c1", "claim");
        assert_eq!(
            h.coordinator.handle_message(claim).await.unwrap(),
            Some(WorkerCommand::Claim)
        );
        assert_eq!(h.host.skip_waiting_calls(), 1);
        assert_eq!(h.host.claim_calls(), 1);

        let update = MessageEvent::new("https://game.example", "c1", "update");
        h.coordinator.handle_message(update).await.unwrap();
        assert_eq!(h.host.claim_calls(), 2);
        assert_eq!(
            h.host.navigations().await,
            vec![("c1".to_string(), url("index.html"))]
        );
    }

    #[tokio::test]
    async fn test_messages_ignored() {
        let h = harness(worker_data(false));
        seed(&h, "game-v2", &["index.html"]).await;

        let foreign = MessageEvent::new("https://evil.example", "c1", "clear");
        assert_eq!(h.coordinator.handle_message(foreign).await.unwrap(), None);

        let unknown_client = MessageEvent::new("https://game.example", "c9", "clear");
        assert_eq!(h.coordinator.handle_message(unknown_client).await.unwrap(), None);

        let no_source = MessageEvent {
            source: None,
            ..MessageEvent::new("https://game.example", "", "clear")
        };
        assert_eq!(h.coordinator.handle_message(no_source).await.unwrap(), None);

        let unknown = MessageEvent::new("https://game.example", "c1", "reload");
        assert_eq!(h.coordinator.handle_message(unknown).await.unwrap(), None);

        assert!(h.caches.has("game-v2").await.unwrap());
        assert_eq!(h.host.skip_waiting_calls(), 0);
    }
}
