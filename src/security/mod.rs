//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted host:
//!     → resource.rs (derive owner/repo key)
//!     → whitelist.rs (repository admission)
//! Forwarding:
//!     → headers.rs (rebuild request headers)
//! Upstream response:
//!     → headers.rs (strip blocking and hop-by-hop headers, add CORS)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a configured whitelist denies anything it does not cover,
//!   except unscoped assets under the default policy
//! - No trust in client input: request headers are rebuilt from an allow-list

pub mod headers;
pub mod resource;
pub mod whitelist;
