//! Environment variable overrides applied on top of the file configuration.

use crate::config::schema::{LocationStyle, ProxyConfig, RedirectMode};

/// Repository whitelist, e.g. `OpenListTeam/OpenList,team/*`.
pub const GITHUB_WHITELIST: &str = "GITHUB_WHITELIST";

/// Listener bind address.
pub const PROXY_BIND_ADDRESS: &str = "PROXY_BIND_ADDRESS";

/// Externally visible origin used for rewritten links.
pub const PROXY_PUBLIC_ORIGIN: &str = "PROXY_PUBLIC_ORIGIN";

/// `follow` or `manual`.
pub const PROXY_REDIRECT_MODE: &str = "PROXY_REDIRECT_MODE";

/// `path` or `query`.
pub const PROXY_LOCATION_STYLE: &str = "PROXY_LOCATION_STYLE";

/// Get all environment variable names for documentation/validation
pub fn all_env_vars() -> &'static [&'static str] {
    &[
        GITHUB_WHITELIST,
        PROXY_BIND_ADDRESS,
        PROXY_PUBLIC_ORIGIN,
        PROXY_REDIRECT_MODE,
        PROXY_LOCATION_STYLE,
    ]
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut ProxyConfig) -> Result<(), String> {
    apply_overrides(config, |name| std::env::var(name).ok())
}

/// Apply overrides from an arbitrary variable source.
///
/// Unset variables leave the configuration untouched; an empty
/// `GITHUB_WHITELIST` explicitly disables the whitelist.
pub fn apply_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(whitelist) = lookup(GITHUB_WHITELIST) {
        config.access.whitelist = whitelist;
    }
    if let Some(addr) = lookup(PROXY_BIND_ADDRESS).filter(|v| !v.trim().is_empty()) {
        config.listener.bind_address = addr.trim().to_string();
    }
    if let Some(origin) = lookup(PROXY_PUBLIC_ORIGIN).filter(|v| !v.trim().is_empty()) {
        config.listener.public_origin = Some(origin.trim().trim_end_matches('/').to_string());
    }
    if let Some(mode) = lookup(PROXY_REDIRECT_MODE) {
        config.upstream.redirect = match mode.trim().to_ascii_lowercase().as_str() {
            "follow" => RedirectMode::Follow,
            "manual" => RedirectMode::Manual,
            other => return Err(format!("{}: unknown redirect mode {:?}", PROXY_REDIRECT_MODE, other)),
        };
    }
    if let Some(style) = lookup(PROXY_LOCATION_STYLE) {
        config.upstream.location_style = match style.trim().to_ascii_lowercase().as_str() {
            "path" => LocationStyle::Path,
            "query" => LocationStyle::Query,
            other => return Err(format!("{}: unknown location style {:?}", PROXY_LOCATION_STYLE, other)),
        };
    }
    Ok(())
}
