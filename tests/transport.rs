//! `ReqwestTransport` against a raw loopback backend.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use url::Url;

use github_proxy::config::{ProxyConfig, RedirectMode};
use github_proxy::error::ProxyError;
use github_proxy::http::{ReqwestTransport, Transport, UpstreamRequest};

mod common;
use common::MockResponse;

fn request(method: Method, url: &str, body: Option<&'static str>) -> UpstreamRequest {
    let mut headers = HeaderMap::new();
    headers.insert("user-agent", HeaderValue::from_static("github-proxy/test"));
    UpstreamRequest {
        method,
        url: Url::parse(url).unwrap(),
        headers,
        body: body.map(Body::from),
    }
}

/// Loopback backends count as an allowed host for redirect following.
fn loopback_allowed() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.asset_hosts.push("127.0.0.1".to_string());
    config
}

#[tokio::test]
async fn test_streams_status_headers_and_body() {
    let seen = Arc::new(Mutex::new(String::new()));
    let seen_clone = seen.clone();
    let backend = common::start_programmable_backend(move |head| {
        *seen_clone.lock().unwrap() = head;
        async {
            MockResponse::status(201, "payload")
                .with_header("x-upstream", "yes")
                .with_header("strict-transport-security", "max-age=1")
        }
    })
    .await;

    let transport = ReqwestTransport::new(&ProxyConfig::default()).unwrap();
    let response = transport
        .send(request(Method::POST, &format!("http://{}/a/b?x=1", backend), Some("data")))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.headers["x-upstream"], "yes");
    // Sanitizing is the response rewriter's job, not the transport's.
    assert!(response.headers.get("strict-transport-security").is_some());
    let body = to_bytes(response.body, 1024).await.unwrap();
    assert_eq!(&body[..], b"payload");

    let head = seen.lock().unwrap().clone();
    assert!(head.starts_with("POST /a/b?x=1 HTTP/1.1\r\n"));
    assert!(head.to_ascii_lowercase().contains("user-agent: github-proxy/test"));
}

#[tokio::test]
async fn test_manual_mode_surfaces_redirect() {
    let backend = common::start_programmable_backend(|_| async {
        MockResponse::status(302, "").with_header("location", "https://github.com/x/y")
    })
    .await;

    let mut config = ProxyConfig::default();
    config.upstream.redirect = RedirectMode::Manual;
    let transport = ReqwestTransport::new(&config).unwrap();
    let response = transport
        .send(request(Method::GET, &format!("http://{}/a/b", backend), None))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.headers["location"], "https://github.com/x/y");
}

#[tokio::test]
async fn test_follow_mode_follows_redirect() {
    let backend = common::start_programmable_backend(|head| async move {
        if head.starts_with("GET /final ") {
            MockResponse::ok("arrived")
        } else {
            MockResponse::status(302, "").with_header("location", "/final")
        }
    })
    .await;

    let transport = ReqwestTransport::new(&loopback_allowed()).unwrap();
    let response = transport
        .send(request(Method::GET, &format!("http://{}/start", backend), None))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    let body = to_bytes(response.body, 1024).await.unwrap();
    assert_eq!(&body[..], b"arrived");
}

#[tokio::test]
async fn test_follow_mode_stops_at_foreign_host() {
    let backend = common::start_programmable_backend(|_| async {
        MockResponse::status(302, "").with_header("location", "http://evil.example.com/payload")
    })
    .await;

    let transport = ReqwestTransport::new(&loopback_allowed()).unwrap();
    let response = transport
        .send(request(Method::GET, &format!("http://{}/start", backend), None))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.headers["location"], "http://evil.example.com/payload");
}

#[tokio::test]
async fn test_response_body_streams_before_upstream_finishes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let release = Arc::new(Notify::new());
    let release_backend = release.clone();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nfirst\r\n")
            .await
            .unwrap();
        socket.flush().await.unwrap();
        // Hold the rest of the body until the client has seen the first chunk.
        release_backend.notified().await;
        socket.write_all(b"4\r\nlast\r\n0\r\n\r\n").await.unwrap();
        let _ = socket.shutdown().await;
    });

    let transport = ReqwestTransport::new(&ProxyConfig::default()).unwrap();
    let response = transport
        .send(request(Method::GET, &format!("http://{}/big", addr), None))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);

    let mut stream = response.body.into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("first chunk should arrive while upstream is still sending")
        .unwrap()
        .unwrap();
    assert_eq!(&first[..], b"first");

    release.notify_one();
    let mut rest = Vec::new();
    while let Some(chunk) = stream.next().await {
        rest.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(rest, b"last");
}

#[tokio::test]
async fn test_connection_refused_maps_to_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = ReqwestTransport::new(&ProxyConfig::default()).unwrap();
    let result = transport
        .send(request(Method::GET, &format!("http://{}/a/b", addr), None))
        .await;

    match result {
        Err(e @ ProxyError::UpstreamTransport(_)) => {
            assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(e.to_string().starts_with("Error proxying to upstream:"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a transport error"),
    }
}
