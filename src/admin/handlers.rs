use axum::{
    extract::State,
    http::{header, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::{LocationStyle, RedirectMode, UnresolvedPolicy};
use crate::error::ProxyError;
use crate::http::response::proxied_link;
use crate::http::server::AppState;

const EXAMPLE_DESTINATION: &str = "https://github.com/user/repo";

/// Effective access configuration as reported by `/debug`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebugReport {
    #[serde(rename = "GITHUB_WHITELIST")]
    pub raw_whitelist: String,
    pub whitelist: Vec<String>,
    pub whitelist_length: usize,
    pub allowed_hosts: Vec<String>,
    pub redirect_mode: RedirectMode,
    pub location_style: LocationStyle,
    pub unresolved_policy: UnresolvedPolicy,
    pub version: String,
}

pub async fn ping() -> &'static str {
    "pong"
}

/// Usage text for `/`, showing how to route a link through this proxy.
pub fn usage(origin: &str, style: LocationStyle) -> Response {
    let body = format!(
        "GitHub proxy is running.\nUsage: {}\n",
        proxied_link(origin, EXAMPLE_DESTINATION, style)
    );
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

pub async fn get_debug(State(state): State<AppState>, uri: Uri) -> Response {
    let snapshot = state.snapshot.load();
    if !snapshot.config.admin.debug_enabled {
        // Disabled: the path is treated like any other malformed destination.
        return ProxyError::Format(uri.path().to_string()).into_response();
    }

    let gate = &snapshot.gate;
    let raw = gate.raw_whitelist();
    let report = DebugReport {
        raw_whitelist: if raw.trim().is_empty() {
            "not set".to_string()
        } else {
            raw.to_string()
        },
        whitelist: gate.whitelist().entries(),
        whitelist_length: gate.whitelist().len(),
        allowed_hosts: gate.hosts().names(),
        redirect_mode: snapshot.config.upstream.redirect,
        location_style: snapshot.config.upstream.location_style,
        unresolved_policy: snapshot.config.access.unresolved,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(report).into_response()
}
