//! Requests, responses and fetch events seen by the worker

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::{OfflineError, Result};

/// How the page issued a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level document navigation
    Navigate,
    /// Same-origin subresource
    SameOrigin,
    /// Opaque cross-origin subresource
    NoCors,
    /// CORS subresource
    #[default]
    Cors,
}

/// A request intercepted by the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Absolute request URL
    pub url: Url,
    /// Referrer URL, empty when the request has none
    pub referrer: String,
    /// Request mode
    pub mode: RequestMode,
}

impl Request {
    /// Create a subresource request without a referrer
    pub fn new(url: Url) -> Self {
        Self {
            url,
            referrer: String::new(),
            mode: RequestMode::default(),
        }
    }

    /// Parse an absolute URL into a request
    pub fn parse(url: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(url)?))
    }

    /// Create a navigation request
    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::new(url)
        }
    }

    /// Set the referrer
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    /// Check if this is a navigation request
    pub fn is_navigate(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// An HTTP response as stored in and served from the cache
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Status text
    pub status_text: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a response with the canonical status text
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 200 OK with a body
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    /// Add or replace a header
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| OfflineError::config(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| OfflineError::config(format!("invalid header value {value:?}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Check if the status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value as text, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A fetch intercepted by the worker
#[derive(Debug, Clone)]
pub struct FetchEvent {
    /// The intercepted request
    pub request: Request,
    /// Response the browser already started loading, when navigation
    /// preload is enabled
    pub preload_response: Option<Response>,
}

impl FetchEvent {
    /// Event without a preloaded response
    pub fn new(request: Request) -> Self {
        Self {
            request,
            preload_response: None,
        }
    }

    /// Attach a preloaded response
    pub fn with_preload(mut self, response: Response) -> Self {
        self.preload_response = Some(response);
        self
    }
}

/// What the worker does with a fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Answer the page with this response
    Respond(Response),
    /// Do not answer; the browser performs its default fetch
    Passthrough,
}

impl FetchOutcome {
    /// The response, if the worker answered
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Respond(r) => Some(r),
            FetchOutcome::Passthrough => None,
        }
    }
}

/// Cache key for a URL: the URL without its fragment
pub fn cache_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}
