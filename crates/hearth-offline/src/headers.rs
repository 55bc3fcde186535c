//! Cross-origin isolation headers
//!
//! Shared-memory threads need the document to be cross-origin isolated.
//! When the host cannot send the headers itself, the worker adds them to
//! every response it serves.

use reqwest::header::{HeaderName, HeaderValue};

use crate::Response;

/// `Cross-Origin-Embedder-Policy`
pub const EMBEDDER_POLICY: HeaderName = HeaderName::from_static("cross-origin-embedder-policy");

/// `Cross-Origin-Opener-Policy`
pub const OPENER_POLICY: HeaderName = HeaderName::from_static("cross-origin-opener-policy");

/// Required embedder policy value
pub const REQUIRE_CORP: &str = "require-corp";

/// Required opener policy value
pub const SAME_ORIGIN: &str = "same-origin";

/// Check if a response already carries both isolation headers with the
/// required values.
pub fn has_isolation_headers(response: &Response) -> bool {
    let coep = response.headers.get(&EMBEDDER_POLICY);
    let coop = response.headers.get(&OPENER_POLICY);
    matches!((coep, coop), (Some(e), Some(o)) if e == REQUIRE_CORP && o == SAME_ORIGIN)
}

/// Add the isolation headers to a response.
///
/// Status, status text, body and every other header are kept. A response
/// that already has both headers is returned unchanged.
pub fn with_isolation_headers(mut response: Response) -> Response {
    if has_isolation_headers(&response) {
        return response;
    }
    response
        .headers
        .insert(EMBEDDER_POLICY, HeaderValue::from_static(REQUIRE_CORP));
    response
        .headers
        .insert(OPENER_POLICY, HeaderValue::from_static(SAME_ORIGIN));
    response
}
