//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform the upstream response for the client
//! - Point redirect `Location` headers back at the proxy (manual mode)
//! - Strip blocking and hop-by-hop headers, add CORS headers
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Status and body pass through untouched
//! - Relative `Location` values are resolved against the destination first

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use url::Url;

use crate::config::{LocationStyle, RedirectMode};
use crate::http::client::UpstreamResponse;
use crate::security::headers::{apply_cors, sanitize_response_headers};

/// Per-request inputs for response rewriting.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    /// Proxy origin without trailing slash.
    pub origin: &'a str,
    pub style: LocationStyle,
    pub redirect: RedirectMode,
    /// Destination the response came from.
    pub destination: &'a Url,
}

pub fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Link that routes `destination` through the proxy.
pub fn proxied_link(origin: &str, destination: &str, style: LocationStyle) -> String {
    match style {
        LocationStyle::Path => format!("{}/{}", origin, destination),
        LocationStyle::Query => {
            let encoded: String = url::form_urlencoded::byte_serialize(destination.as_bytes()).collect();
            format!("{}/?url={}", origin, encoded)
        }
    }
}

/// Rewrite `Location` so following the redirect stays inside the proxy.
pub fn rewrite_location(headers: &mut HeaderMap, ctx: &RewriteContext<'_>) {
    let Some(location) = headers.get(header::LOCATION).and_then(|v| v.to_str().ok()) else {
        return;
    };
    let Ok(absolute) = ctx.destination.join(location) else {
        tracing::debug!(location = %location, "Unparsable Location left unchanged");
        return;
    };

    let link = proxied_link(ctx.origin, absolute.as_str(), ctx.style);
    match HeaderValue::from_str(&link) {
        Ok(value) => {
            headers.insert(header::LOCATION, value);
        }
        Err(e) => tracing::warn!(error = %e, "Rewritten Location is not a valid header"),
    }
}

/// Turn the upstream response into the client response.
pub fn finalize(upstream: UpstreamResponse, ctx: &RewriteContext<'_>) -> Response {
    let UpstreamResponse { status, mut headers, body } = upstream;

    if ctx.redirect == RedirectMode::Manual && is_redirect(status) {
        rewrite_location(&mut headers, ctx);
    }
    sanitize_response_headers(&mut headers);
    apply_cors(&mut headers);

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
