//! Repository whitelist.
//!
//! # Entry forms
//! - `owner/repo`: exactly that repository
//! - `owner/*`: every repository of `owner`
//! - `*/*`: every repository
//! - `gist/*`: opens the gist host, which has no repository keys
//!
//! # Design Decisions
//! - Pure membership tests; order of entries is irrelevant
//! - Exact string comparison, no globbing beyond the forms above
//! - An empty whitelist disables repository checks

use std::collections::HashSet;

use url::Url;

use crate::config::UnresolvedPolicy;
use crate::error::{ProxyError, Result};
use crate::routing::hosts::HostClass;
use crate::security::resource::ResourceKey;

/// Owner segment that opens the gist host.
const GIST_OWNER: &str = "gist";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WhitelistEntry {
    Exact(String),
    Owner(String),
    Any,
}

impl WhitelistEntry {
    pub fn parse(entry: &str) -> Self {
        if entry == "*/*" {
            return WhitelistEntry::Any;
        }
        match entry.strip_suffix("/*") {
            Some(owner) if !owner.is_empty() && !owner.contains('/') => {
                WhitelistEntry::Owner(owner.to_string())
            }
            _ => WhitelistEntry::Exact(entry.to_string()),
        }
    }
}

impl std::fmt::Display for WhitelistEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhitelistEntry::Exact(key) => f.write_str(key),
            WhitelistEntry::Owner(owner) => write!(f, "{}/*", owner),
            WhitelistEntry::Any => f.write_str("*/*"),
        }
    }
}

/// Parsed set of whitelist entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Whitelist {
    entries: HashSet<WhitelistEntry>,
}

impl Whitelist {
    /// Parse a delimited list; `,` and the full-width `，` both separate.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(&[',', '，'][..])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(WhitelistEntry::parse)
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries rendered back to their textual form, sorted.
    pub fn entries(&self) -> Vec<String> {
        let mut entries: Vec<&WhitelistEntry> = self.entries.iter().collect();
        entries.sort();
        entries.into_iter().map(ToString::to_string).collect()
    }

    fn has_any(&self) -> bool {
        self.entries.contains(&WhitelistEntry::Any)
    }

    fn has_owner(&self, owner: &str) -> bool {
        self.entries.contains(&WhitelistEntry::Owner(owner.to_string()))
    }

    /// Whether the repository is covered by an exact, owner or global entry.
    pub fn allows_key(&self, key: &ResourceKey) -> bool {
        self.has_any()
            || self.entries.contains(&WhitelistEntry::Exact(key.to_string()))
            || self.has_owner(&key.owner)
    }

    pub fn allows_gist(&self) -> bool {
        self.has_any() || self.has_owner(GIST_OWNER)
    }
}

/// Decides whether a validated destination may be forwarded.
#[derive(Debug, Clone)]
pub struct Authorizer {
    whitelist: Whitelist,
    unresolved: UnresolvedPolicy,
}

impl Authorizer {
    pub fn new(whitelist: Whitelist, unresolved: UnresolvedPolicy) -> Self {
        Self { whitelist, unresolved }
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn authorize(&self, class: HostClass, key: Option<&ResourceKey>, url: &Url) -> Result<()> {
        if self.whitelist.is_empty() {
            return Ok(());
        }

        let allowed = match (class, key) {
            (HostClass::Gist, _) => self.whitelist.allows_gist(),
            (_, Some(key)) => self.whitelist.allows_key(key),
            (_, None) => match self.unresolved {
                UnresolvedPolicy::Allow => true,
                UnresolvedPolicy::Deny => self.whitelist.has_any(),
            },
        };

        if allowed {
            return Ok(());
        }

        let subject = match (class, key) {
            (HostClass::Gist, _) => url.host_str().unwrap_or_default().to_string(),
            (_, Some(key)) => key.to_string(),
            (_, None) => url.to_string(),
        };
        Err(ProxyError::ResourceNotWhitelisted(subject))
    }
}
