//! Upstream host allow-list.
//!
//! # Design Decisions
//! - Exact membership only; no suffix matching (`github.com.evil.com` and
//!   `evil-github.com` are both foreign)
//! - Hosts are compared after URL parsing, which lower-cases them
//! - Each host carries the class that decides how repository keys are derived

use std::collections::HashMap;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{ProxyError, Result};

/// Role of an allowed upstream host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostClass {
    /// Repository pages, archives, release downloads.
    Main,
    /// Raw file content.
    Raw,
    /// REST API.
    Api,
    /// Gists.
    Gist,
    /// Shared content with no repository scope (LFS, assets, images).
    Asset,
}

impl HostClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostClass::Main => "main",
            HostClass::Raw => "raw",
            HostClass::Api => "api",
            HostClass::Gist => "gist",
            HostClass::Asset => "asset",
        }
    }
}

/// Immutable set of upstream hosts the proxy will talk to.
#[derive(Debug, Clone)]
pub struct AllowedHostSet {
    hosts: HashMap<String, HostClass>,
}

impl AllowedHostSet {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        let mut hosts = HashMap::new();
        for host in &config.asset_hosts {
            hosts.insert(host.clone(), HostClass::Asset);
        }
        hosts.insert(config.main_host.clone(), HostClass::Main);
        hosts.insert(config.raw_host.clone(), HostClass::Raw);
        hosts.insert(config.api_host.clone(), HostClass::Api);
        hosts.insert(config.gist_host.clone(), HostClass::Gist);
        Self { hosts }
    }

    pub fn classify(&self, host: &str) -> Option<HostClass> {
        self.hosts.get(host).copied()
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains_key(host)
    }

    /// Host names in lexical order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hosts.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Reject destinations whose host is not in the set.
    ///
    /// The authority must be the bare host: an explicit non-default port or
    /// embedded credentials are refused even for an allowed host.
    pub fn check(&self, url: &Url) -> Result<HostClass> {
        let host = url.host_str().unwrap_or_default();
        if let Some(port) = url.port() {
            return Err(ProxyError::HostNotAllowed(format!("{}:{}", host, port)));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(ProxyError::HostNotAllowed(format!("{} (credentials in URL)", host)));
        }
        self.classify(host)
            .ok_or_else(|| ProxyError::HostNotAllowed(host.to_string()))
    }
}
