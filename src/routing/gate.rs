//! Destination admission.
//!
//! # Responsibilities
//! - Run extraction, host check, key resolution and whitelist in order
//! - Return the admitted destination or the first terminal error
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Compiled from a validated `ProxyConfig`; reloads build a new gate
//! - No I/O: admission is decided before any upstream contact

use url::Url;

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::routing::extractor::{InboundTarget, UrlExtractor};
use crate::routing::hosts::{AllowedHostSet, HostClass};
use crate::security::resource::{self, ResourceKey};
use crate::security::whitelist::{Authorizer, Whitelist};

/// A destination that passed every admission stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub url: Url,
    pub class: HostClass,
    pub key: Option<ResourceKey>,
}

impl Destination {
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct Gate {
    extractor: UrlExtractor,
    hosts: AllowedHostSet,
    authorizer: Authorizer,
    raw_whitelist: String,
}

impl Gate {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            extractor: UrlExtractor::default(),
            hosts: AllowedHostSet::from_config(&config.upstream),
            authorizer: Authorizer::new(
                Whitelist::parse(&config.access.whitelist),
                config.access.unresolved,
            ),
            raw_whitelist: config.access.whitelist.clone(),
        }
    }

    pub fn hosts(&self) -> &AllowedHostSet {
        &self.hosts
    }

    pub fn whitelist(&self) -> &Whitelist {
        self.authorizer.whitelist()
    }

    /// The whitelist exactly as configured.
    pub fn raw_whitelist(&self) -> &str {
        &self.raw_whitelist
    }

    /// Decide whether the inbound target may be forwarded, and where.
    pub fn admit(&self, target: &InboundTarget<'_>) -> Result<Destination> {
        let url = self.extractor.extract(target, &self.hosts)?;
        let class = self.hosts.check(&url)?;
        let key = resource::resolve(class, &url);
        self.authorizer.authorize(class, key.as_ref(), &url)?;

        Ok(Destination { url, class, key })
    }
}
