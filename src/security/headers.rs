//! Header manipulation and security headers.
//!
//! # Responsibilities
//! - Rebuild upstream request headers from a fixed allow-list
//! - Strip hop-by-hop headers from upstream responses
//! - Strip response headers that break delivery under the proxy origin
//! - Attach permissive CORS headers
//!
//! # Design Decisions
//! - Request headers are rebuilt, never copied: cookies, authorization and
//!   forwarding headers from the client never reach the upstream
//! - Header names are matched case-insensitively (HeaderMap normalizes)

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Client headers passed through to the upstream when present.
pub const FORWARDED_REQUEST_HEADERS: &[HeaderName] = &[
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
    header::CONTENT_TYPE,
];

/// Upstream headers that would stop pages or assets from rendering when
/// served from the proxy origin.
pub const BLOCKING_RESPONSE_HEADERS: &[HeaderName] = &[
    header::CONTENT_SECURITY_POLICY,
    header::CONTENT_SECURITY_POLICY_REPORT_ONLY,
    header::STRICT_TRANSPORT_SECURITY,
    header::X_FRAME_OPTIONS,
];

/// Connection-scoped headers that must not be relayed.
pub const HOP_BY_HOP_HEADERS: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// `Keep-Alive` has no constant in the `http` crate.
const KEEP_ALIVE: &str = "keep-alive";

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Build the upstream request header set from the inbound headers.
pub fn forward_request_headers(inbound: &HeaderMap, user_agent: &HeaderValue) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in FORWARDED_REQUEST_HEADERS {
        if let Some(value) = inbound.get(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
    headers.insert(header::USER_AGENT, user_agent.clone());
    headers
}

/// Remove hop-by-hop and origin-blocking headers from an upstream response.
pub fn sanitize_response_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS.iter().chain(BLOCKING_RESPONSE_HEADERS) {
        headers.remove(name);
    }
    headers.remove(KEEP_ALIVE);
}

/// Allow browser scripts on any origin to use the proxy.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
}
