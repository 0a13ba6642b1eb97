//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, origins and header values
//! - Validate value ranges (timeouts > 0)
//! - Detect duplicate upstream hosts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {:?}", config.listener.bind_address),
        ));
    }

    if let Some(origin) = &config.listener.public_origin {
        match Url::parse(origin) {
            Ok(url) if url.host_str().is_some() && url.path() == "/" && url.query().is_none() => {}
            _ => errors.push(ValidationError::new(
                "listener.public_origin",
                format!("expected scheme://host[:port] without path, got {:?}", origin),
            )),
        }
    }

    let upstream = &config.upstream;
    let named = [
        ("upstream.main_host", &upstream.main_host),
        ("upstream.raw_host", &upstream.raw_host),
        ("upstream.api_host", &upstream.api_host),
        ("upstream.gist_host", &upstream.gist_host),
    ];
    let mut seen = HashSet::new();
    for (field, host) in named
        .into_iter()
        .chain(upstream.asset_hosts.iter().map(|h| ("upstream.asset_hosts", h)))
    {
        if !is_plain_hostname(host) {
            errors.push(ValidationError::new(
                field,
                format!("not a lower-case hostname: {:?}", host),
            ));
        } else if !seen.insert(host.as_str()) {
            errors.push(ValidationError::new(field, format!("duplicate host {:?}", host)));
        }
    }

    if HeaderValue::from_str(&upstream.user_agent).is_err() || upstream.user_agent.is_empty() {
        errors.push(ValidationError::new(
            "upstream.user_agent",
            "must be a non-empty header value",
        ));
    }

    for (field, secs) in [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.read_secs", config.timeouts.read_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if secs == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.limits.max_request_body_bytes == 0 {
        errors.push(ValidationError::new(
            "limits.max_request_body_bytes",
            "must be greater than zero",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Hostnames are compared verbatim against parsed URLs, which are lower-cased.
fn is_plain_hostname(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && !host.starts_with('.')
        && !host.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.upstream.raw_host = "GitHub.com".into();
        config.upstream.asset_hosts.push("api.github.com".into());
        config.timeouts.connect_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "upstream.raw_host",
                "upstream.asset_hosts",
                "timeouts.connect_secs",
            ]
        );
    }

    #[test]
    fn test_public_origin_must_be_bare() {
        let mut config = ProxyConfig::default();
        config.listener.public_origin = Some("https://proxy.example.com".into());
        assert!(validate_config(&config).is_ok());

        config.listener.public_origin = Some("https://proxy.example.com/sub".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "listener.public_origin");
    }
}
