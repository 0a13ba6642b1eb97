//! GitHub reverse proxy library.
//!
//! Forwards requests for GitHub-family hosts (repository pages, raw content,
//! API, gists, release assets) so clients that cannot reach GitHub directly
//! can fetch through this service.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, Result};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Destination, Gate};
