//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → extractor.rs (recover absolute destination URL)
//!     → hosts.rs (allow-list check, host class)
//!     → security::resource (owner/repo key)
//!     → security::whitelist (repository admission)
//!     → Return: admitted Destination or terminal ProxyError
//!
//! Gate Compilation (at startup and on reload):
//!     ProxyConfig
//!     → AllowedHostSet + Whitelist
//!     → Freeze as immutable Gate
//! ```
//!
//! # Design Decisions
//! - Gate compiled from config, immutable at runtime
//! - No regex in hot path (prefix and set membership only)
//! - Deterministic: same input always yields the same decision
//! - First extraction form that matches wins

pub mod extractor;
pub mod gate;
pub mod hosts;

pub use gate::{Destination, Gate};
pub use hosts::{AllowedHostSet, HostClass};
