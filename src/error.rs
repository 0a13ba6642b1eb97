//! Request pipeline errors.
//!
//! Every variant is terminal for its request and renders a self-describing
//! response that echoes the offending input.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type alias for pipeline stages.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Diagnostic payload returned in place of an upstream 404.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotFoundDiagnostic {
    pub message: String,
    pub target_url: String,
    pub upstream: UpstreamStatus,
    pub request_headers_sent: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpstreamStatus {
    pub status: u16,
    pub status_text: String,
}

#[derive(Debug, Error)]
pub enum ProxyError {
    /// No accepted destination encoding matched.
    #[error("Invalid URL format. Use /https://<host>/<path> or /?url=<url>. Received: {0}")]
    Format(String),

    /// Destination host outside the allowed upstream set.
    #[error("Host not allowed: {0}")]
    HostNotAllowed(String),

    /// Whitelist is active and the destination is not covered by it.
    #[error("Repository not in whitelist: {0}")]
    ResourceNotWhitelisted(String),

    /// Network failure talking to the upstream.
    #[error("Error proxying to upstream: {0}")]
    UpstreamTransport(String),

    /// Upstream answered 404 and diagnostics are enabled.
    #[error("Upstream returned 404 for {}", .0.target_url)]
    UpstreamNotFound(Box<NotFoundDiagnostic>),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Format(_) => StatusCode::BAD_REQUEST,
            ProxyError::HostNotAllowed(_) | ProxyError::ResourceNotWhitelisted(_) => {
                StatusCode::FORBIDDEN
            }
            ProxyError::UpstreamTransport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::UpstreamNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            ProxyError::Format(_) => "format",
            ProxyError::HostNotAllowed(_) => "host_not_allowed",
            ProxyError::ResourceNotWhitelisted(_) => "not_whitelisted",
            ProxyError::UpstreamTransport(_) => "upstream_transport",
            ProxyError::UpstreamNotFound(_) => "upstream_not_found",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ProxyError::UpstreamNotFound(diagnostic) => (status, Json(*diagnostic)).into_response(),
            other => (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                other.to_string(),
            )
                .into_response(),
        }
    }
}
