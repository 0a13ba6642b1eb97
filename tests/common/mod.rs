//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

use github_proxy::config::ProxyConfig;
use github_proxy::error::{ProxyError, Result};
use github_proxy::http::{HttpServer, Transport, UpstreamRequest, UpstreamResponse};
use github_proxy::lifecycle::Shutdown;

/// Canned answer for a mock upstream.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type", "text/plain".to_string())],
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

/// What the proxy sent upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// In-process upstream: records every request and replies with a script.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    reply: Arc<Mutex<Option<MockResponse>>>,
}

impl RecordingTransport {
    /// Answer every request with `response`.
    pub fn replying(response: MockResponse) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            reply: Arc::new(Mutex::new(Some(response))),
        }
    }

    /// Fail every request as if the upstream were unreachable.
    pub fn failing() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            reply: Arc::new(Mutex::new(None)),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> RecordedRequest {
        self.requests().pop().expect("no upstream request recorded")
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse>> {
        Box::pin(async move {
            let body = match request.body {
                Some(body) => to_bytes(body, usize::MAX).await.unwrap().to_vec(),
                None => Vec::new(),
            };
            self.requests.lock().unwrap().push(RecordedRequest {
                method: request.method,
                url: request.url,
                headers: request.headers,
                body,
            });

            let reply = self.reply.lock().unwrap().clone();
            let Some(reply) = reply else {
                return Err(ProxyError::UpstreamTransport(
                    "error sending request: connection refused".to_string(),
                ));
            };

            let mut headers = HeaderMap::new();
            for (name, value) in &reply.headers {
                headers.append(
                    HeaderName::from_static(*name),
                    HeaderValue::from_str(value).unwrap(),
                );
            }
            Ok(UpstreamResponse {
                status: StatusCode::from_u16(reply.status).unwrap(),
                headers,
                body: Body::from(reply.body),
            })
        })
    }
}

/// Upstream that never answers within a test's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct StallingTransport {
    pub delay: Duration,
}

impl Transport for StallingTransport {
    fn send(&self, _request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(UpstreamResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Body::from("too late"),
            })
        })
    }
}

/// Serve the proxy on an ephemeral loopback port.
///
/// Returns the address and the shutdown handle; the config channel is kept
/// open for the lifetime of the server.
pub async fn spawn_proxy(
    config: ProxyConfig,
    transport: Arc<dyn Transport>,
) -> (SocketAddr, Shutdown, mpsc::UnboundedSender<ProxyConfig>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    let (config_tx, config_rx) = mpsc::unbounded_channel();

    let server = HttpServer::with_transport(config, transport);
    tokio::spawn(async move {
        server.run(listener, config_rx, shutdown_rx).await.unwrap();
    });

    // Give the server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown, config_tx)
}

/// Client that surfaces redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Start a programmable raw HTTP/1.1 backend on an ephemeral port.
///
/// The handler receives the request head and returns the reply. Each
/// connection serves a single response.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let reply = f(head).await;

                        let reason = StatusCode::from_u16(reply.status)
                            .ok()
                            .and_then(|s| s.canonical_reason())
                            .unwrap_or("Unknown");
                        let mut response = format!("HTTP/1.1 {} {}\r\n", reply.status, reason);
                        for (name, value) in &reply.headers {
                            response.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        response.push_str(&format!(
                            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            reply.body.len(),
                            reply.body
                        ));
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read the request head, then drain any `Content-Length` body.
async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let chunked = head.to_ascii_lowercase().contains("transfer-encoding: chunked");
    loop {
        let done = if chunked {
            buf[head_end..].windows(5).any(|w| w == b"0\r\n\r\n")
        } else {
            buf.len() >= head_end + content_length
        };
        if done {
            break;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    head
}
