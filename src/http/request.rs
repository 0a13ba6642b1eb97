//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Determine the proxy's externally visible origin
//! - Prepare the sanitized upstream request
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Inbound headers are never copied wholesale; see `security::headers`
//! - A body is only attached when the client actually sent one

use axum::{
    body::Body,
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::client::UpstreamRequest;
use crate::routing::Destination;
use crate::security::headers::forward_request_headers;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Stamps every inbound request with a fresh UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID set by the request-id layer, or "unknown".
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Origin clients use to reach the proxy, without a trailing slash.
///
/// A configured public origin wins; otherwise `X-Forwarded-Proto` (or
/// `http`) is combined with the `Host` header.
pub fn proxy_origin(headers: &HeaderMap, configured: Option<&str>) -> String {
    if let Some(origin) = configured {
        return origin.trim_end_matches('/').to_string();
    }

    let scheme = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| *v == "http" || *v == "https")
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    format!("{}://{}", scheme, host)
}

/// Whether the inbound request carries a body worth streaming upstream.
fn has_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// Build the upstream request for an admitted destination.
pub fn upstream_request(
    parts: &Parts,
    body: Body,
    destination: &Destination,
    user_agent: &HeaderValue,
) -> UpstreamRequest {
    UpstreamRequest {
        method: parts.method.clone(),
        url: destination.url.clone(),
        headers: forward_request_headers(&parts.headers, user_agent),
        body: has_body(&parts.headers).then_some(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use crate::config::ProxyConfig;
    use crate::routing::extractor::InboundTarget;
    use crate::routing::Gate;

    #[test]
    fn test_request_ids_are_unique() {
        let mut maker = MakeRequestUuidV4;
        let req = Request::builder().body(()).unwrap();
        let a = maker.make_request_id(&req).unwrap();
        let b = maker.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
        assert_eq!(a.header_value().len(), 36);
    }

    #[test]
    fn test_origin_prefers_configuration() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));
        assert_eq!(
            proxy_origin(&headers, Some("https://gh.example.com/")),
            "https://gh.example.com"
        );
    }

    #[test]
    fn test_origin_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("proxy.local:8080"));
        assert_eq!(proxy_origin(&headers, None), "http://proxy.local:8080");

        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https, http"));
        assert_eq!(proxy_origin(&headers, None), "https://proxy.local:8080");

        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("gopher"));
        assert_eq!(proxy_origin(&headers, None), "http://proxy.local:8080");
    }

    #[test]
    fn test_upstream_request_shape() {
        let gate = Gate::from_config(&ProxyConfig::default());
        let destination = gate
            .admit(&InboundTarget::new("/https://github.com/a/b/archive/main.zip", None))
            .unwrap();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/https://github.com/a/b/archive/main.zip")
            .header(header::CONTENT_LENGTH, "2")
            .header(header::COOKIE, "secret")
            .body(Body::from("{}"))
            .unwrap();
        let (parts, body) = request.into_parts();

        let ua = HeaderValue::from_static("github-proxy/test");
        let upstream = upstream_request(&parts, body, &destination, &ua);
        assert_eq!(upstream.method, Method::POST);
        assert_eq!(upstream.url.as_str(), "https://github.com/a/b/archive/main.zip");
        assert!(upstream.body.is_some());
        assert!(upstream.headers.get(header::COOKIE).is_none());
        assert_eq!(upstream.headers.get(header::USER_AGENT).unwrap(), "github-proxy/test");
    }

    #[test]
    fn test_bodyless_request() {
        let gate = Gate::from_config(&ProxyConfig::default());
        let destination = gate.admit(&InboundTarget::new("/github.com/a/b", None)).unwrap();
        let (parts, body) = Request::builder()
            .uri("/github.com/a/b")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let upstream = upstream_request(&parts, body, &destination, &HeaderValue::from_static("ua"));
        assert!(upstream.body.is_none());
    }
}
