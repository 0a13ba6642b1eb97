//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, public origin).
    pub listener: ListenerConfig,

    /// Upstream hosts and forwarding behavior.
    pub upstream: UpstreamConfig,

    /// Repository whitelist settings.
    pub access: AccessConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator endpoints.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Externally visible origin (e.g., "https://ghproxy.example.com").
    /// When unset, the origin is derived from the request's Host header.
    pub public_origin: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            public_origin: None,
        }
    }
}

/// How upstream redirects reach the client.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMode {
    /// The transport follows redirects; clients never see them.
    #[default]
    Follow,
    /// Redirects are returned with `Location` pointed back at the proxy.
    Manual,
}

/// Shape of proxy links (rewritten `Location`, usage text).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationStyle {
    /// `{origin}/{destination}`
    #[default]
    Path,
    /// `{origin}/?url={encoded destination}`
    Query,
}

/// Upstream host set and forwarding behavior.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Main site (repository pages, archives, releases).
    pub main_host: String,

    /// Raw file content host.
    pub raw_host: String,

    /// REST API host.
    pub api_host: String,

    /// Gist host.
    pub gist_host: String,

    /// Hosts serving shared, non repository-scoped content
    /// (LFS objects, static assets, image proxy).
    pub asset_hosts: Vec<String>,

    /// User-Agent sent on every upstream request.
    pub user_agent: String,

    /// Redirect handling.
    pub redirect: RedirectMode,

    /// Link style for rewritten redirects and usage text.
    pub location_style: LocationStyle,

    /// Replace upstream 404 responses with a JSON diagnostic payload.
    pub diagnose_not_found: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            main_host: "github.com".to_string(),
            raw_host: "raw.githubusercontent.com".to_string(),
            api_host: "api.github.com".to_string(),
            gist_host: "gist.github.com".to_string(),
            asset_hosts: vec![
                "objects.githubusercontent.com".to_string(),
                "github.githubassets.com".to_string(),
                "camo.githubusercontent.com".to_string(),
            ],
            user_agent: concat!("github-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
            redirect: RedirectMode::default(),
            location_style: LocationStyle::default(),
            diagnose_not_found: true,
        }
    }
}

/// What to do with destinations that carry no repository key
/// while a whitelist is active.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Shared assets stay reachable for whitelisted projects.
    #[default]
    Allow,
    /// Only a global `*/*` entry admits them.
    Deny,
}

/// Repository whitelist configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Delimited whitelist (`,` or `，`), e.g. "owner/repo, team/*".
    /// Empty disables repository checks.
    pub whitelist: String,

    /// Policy for destinations without a resolvable repository.
    pub unresolved: UnresolvedPolicy,
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Maximum idle time between body reads in seconds.
    pub read_secs: u64,

    /// Time allowed until response headers are available, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            read_secs: 60,
            request_secs: 60,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound request body size in bytes.
    pub max_request_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Operator endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve `/debug` with the parsed whitelist and host set.
    pub debug_enabled: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            debug_enabled: true,
        }
    }
}
