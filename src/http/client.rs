//! Upstream transport.
//!
//! # Responsibilities
//! - Issue exactly one upstream request per admitted inbound request
//! - Stream request and response bodies without buffering
//! - Apply connect/read deadlines and the redirect policy
//! - In follow mode, only follow redirects that stay on allowed hosts
//! - Map network failures to `ProxyError::UpstreamTransport`
//!
//! # Design Decisions
//! - `Transport` is a trait object so the pipeline can run against an
//!   in-process upstream
//! - No retries: every failure is terminal for its request
//! - Dropping the response body drops the upstream connection, so a client
//!   hanging up aborts the upstream fetch

use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Method, StatusCode},
};
use futures_util::future::BoxFuture;
use reqwest::redirect::Policy;
use url::Url;

use crate::config::{ProxyConfig, RedirectMode};
use crate::error::{ProxyError, Result};
use crate::routing::hosts::AllowedHostSet;

/// Redirect hops followed in `follow` mode before giving up.
const MAX_REDIRECTS: usize = 10;

/// Outbound request, headers already sanitized.
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// `None` for requests without a body.
    pub body: Option<Body>,
}

/// Upstream answer with its body still streaming.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Sends admitted requests to the upstream host.
pub trait Transport: Send + Sync {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse>>;
}

/// Production transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ProxyConfig) -> std::result::Result<Self, reqwest::Error> {
        let redirect = match config.upstream.redirect {
            RedirectMode::Follow => follow_within(AllowedHostSet::from_config(&config.upstream)),
            RedirectMode::Manual => Policy::none(),
        };

        let client = reqwest::Client::builder()
            .redirect(redirect)
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .read_timeout(Duration::from_secs(config.timeouts.read_secs))
            .build()?;

        Ok(Self { client })
    }
}

/// Follow redirects only while they stay on allowed hosts.
///
/// A hop to a foreign host stops the chain and the redirect itself is
/// returned, so the allow-list holds for every request the proxy issues.
fn follow_within(hosts: AllowedHostSet) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let host = attempt.url().host_str().unwrap_or_default();
        if hosts.contains(host) {
            attempt.follow()
        } else {
            tracing::debug!(location = %attempt.url(), "Redirect leaves the allowed hosts; not following");
            attempt.stop()
        }
    })
}

impl Transport for ReqwestTransport {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method, request.url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
            }

            let response = builder
                .send()
                .await
                .map_err(|e| ProxyError::UpstreamTransport(error_chain(&e)))?;

            let status = response.status();
            let headers = response.headers().clone();
            Ok(UpstreamResponse {
                status,
                headers,
                body: Body::from_stream(response.bytes_stream()),
            })
        })
    }
}

/// Render an error with its sources, e.g. "error sending request: connection refused".
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
