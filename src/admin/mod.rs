//! Operational endpoints served next to the proxy routes.
//!
//! - `/ping` liveness probe
//! - `/` usage text
//! - `/debug` effective access configuration, when enabled

pub mod handlers;

pub use handlers::DebugReport;
