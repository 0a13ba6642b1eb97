//! Repository key resolution.
//!
//! Maps a validated destination onto the `owner/repo` it belongs to, or to
//! nothing when the host serves content without repository scope.

use url::Url;

use crate::routing::hosts::HostClass;

/// An `owner/repo` pair taken from a destination path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub owner: String,
    pub repo: String,
}

impl ResourceKey {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Resolve the repository key for a destination on a host of the given class.
pub fn resolve(class: HostClass, url: &Url) -> Option<ResourceKey> {
    let segments: Vec<&str> = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match (class, segments.as_slice()) {
        (HostClass::Main | HostClass::Raw, [owner, repo, ..]) => Some(ResourceKey::new(*owner, *repo)),
        (HostClass::Api, ["repos", owner, repo, ..]) => Some(ResourceKey::new(*owner, *repo)),
        _ => None,
    }
}
