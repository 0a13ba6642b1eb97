//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout, body limit)
//!     → routing::Gate (extract destination, host guard, whitelist)
//!     → request.rs (sanitized upstream request)
//!     → client.rs (one upstream round trip, streamed)
//!     → response.rs (Location rewrite, header strip, CORS)
//!     → Send to client
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;

pub use client::{ReqwestTransport, Transport, UpstreamRequest, UpstreamResponse};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, Snapshot};
