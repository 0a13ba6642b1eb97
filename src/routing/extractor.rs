//! Destination URL extraction.
//!
//! # Responsibilities
//! - Recover the absolute upstream URL from the inbound path or query
//! - Accept the encodings clients and intermediaries actually produce
//!
//! # Accepted forms (first match wins)
//! ```text
//! /https://github.com/a/b        scheme in path
//! /https:/github.com/a/b         scheme with a collapsed slash
//! /github.com/a/b                bare allowed host
//! /?url=https%3A%2F%2Fgithub...  query parameter
//! ```
//!
//! # Design Decisions
//! - Each form is a pure strategy behind the `DestinationForm` trait
//! - A form that matches but yields an unparsable URL is a hard failure;
//!   later forms are not consulted
//! - Path forms carry the inbound query string over to the destination

use url::Url;

use crate::error::{ProxyError, Result};
use crate::routing::hosts::AllowedHostSet;

const SCHEME: &str = "https://";
const COMPRESSED_SCHEME: &str = "https:/";
const URL_PARAM: &str = "url";

/// The parts of an inbound request that can carry a destination.
#[derive(Debug, Clone, Copy)]
pub struct InboundTarget<'a> {
    /// Request path including the leading `/`.
    pub path: &'a str,
    /// Raw query string without `?`.
    pub query: Option<&'a str>,
}

impl<'a> InboundTarget<'a> {
    pub fn new(path: &'a str, query: Option<&'a str>) -> Self {
        Self { path, query }
    }

    fn rest(&self) -> &'a str {
        self.path.strip_prefix('/').unwrap_or(self.path)
    }

    /// Reattach the inbound query to a destination built from the path.
    fn with_query(&self, destination: String) -> String {
        match self.query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{}?{}", destination, q),
            None => destination,
        }
    }

    /// The raw input, echoed back in format errors.
    pub fn raw(&self) -> String {
        match self.query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.to_string(),
        }
    }
}

/// One accepted destination encoding.
pub trait DestinationForm: Send + Sync + std::fmt::Debug {
    /// Returns the candidate destination if this form recognizes the input.
    fn try_extract(&self, target: &InboundTarget<'_>, hosts: &AllowedHostSet) -> Option<String>;
}

/// `/https://host/path`
#[derive(Debug)]
pub struct SchemePath;

impl DestinationForm for SchemePath {
    fn try_extract(&self, target: &InboundTarget<'_>, _hosts: &AllowedHostSet) -> Option<String> {
        let rest = target.rest();
        rest.starts_with(SCHEME)
            .then(|| target.with_query(rest.to_string()))
    }
}

/// `/https:/host/path`, left behind by proxies that merge slashes.
#[derive(Debug)]
pub struct CompressedSchemePath;

impl DestinationForm for CompressedSchemePath {
    fn try_extract(&self, target: &InboundTarget<'_>, _hosts: &AllowedHostSet) -> Option<String> {
        let rest = target.rest();
        if rest.starts_with(SCHEME) {
            return None;
        }
        rest.strip_prefix(COMPRESSED_SCHEME)
            .map(|tail| target.with_query(format!("{}{}", SCHEME, tail)))
    }
}

/// `/host/path` where `host` is one of the allowed upstream hosts.
#[derive(Debug)]
pub struct BareHostPath;

impl DestinationForm for BareHostPath {
    fn try_extract(&self, target: &InboundTarget<'_>, hosts: &AllowedHostSet) -> Option<String> {
        let rest = target.rest();
        let host = rest.split('/').next().unwrap_or_default();
        hosts
            .contains(host)
            .then(|| target.with_query(format!("{}{}", SCHEME, rest)))
    }
}

/// `/?url=<absolute url>`
#[derive(Debug)]
pub struct QueryParam;

impl DestinationForm for QueryParam {
    fn try_extract(&self, target: &InboundTarget<'_>, _hosts: &AllowedHostSet) -> Option<String> {
        let query = target.query?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == URL_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }
}

/// Ordered chain of destination forms.
#[derive(Debug)]
pub struct UrlExtractor {
    forms: Vec<Box<dyn DestinationForm>>,
}

impl Default for UrlExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(SchemePath),
            Box::new(CompressedSchemePath),
            Box::new(BareHostPath),
            Box::new(QueryParam),
        ])
    }
}

impl UrlExtractor {
    pub fn new(forms: Vec<Box<dyn DestinationForm>>) -> Self {
        Self { forms }
    }

    /// Extract the absolute destination URL.
    pub fn extract(&self, target: &InboundTarget<'_>, hosts: &AllowedHostSet) -> Result<Url> {
        let candidate = self
            .forms
            .iter()
            .find_map(|form| form.try_extract(target, hosts))
            .ok_or_else(|| ProxyError::Format(target.raw()))?;

        match Url::parse(&candidate) {
            Ok(url) if url.has_host() => Ok(url),
            _ => Err(ProxyError::Format(target.raw())),
        }
    }
}
