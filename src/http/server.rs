//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, body limit)
//! - Bound the wait for upstream response headers
//! - Bind server to listener
//! - Admit requests through the gate and forward them upstream
//! - Swap in reloaded configuration
//! - Observability (metrics, correlation IDs)

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin;
use crate::config::ProxyConfig;
use crate::error::{NotFoundDiagnostic, ProxyError, UpstreamStatus};
use crate::http::client::{ReqwestTransport, Transport, UpstreamRequest, UpstreamResponse};
use crate::http::request::{proxy_origin, request_id, upstream_request, MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::response::{finalize, RewriteContext};
use crate::observability::metrics;
use crate::routing::extractor::InboundTarget;
use crate::routing::{Destination, Gate};

const NOT_FOUND_MESSAGE: &str =
    "Upstream returned 404. Check that the target URL is correct and the repository is public.";

/// Compiled view of one configuration generation.
#[derive(Debug)]
pub struct Snapshot {
    pub config: ProxyConfig,
    pub gate: Gate,
    pub user_agent: HeaderValue,
}

impl Snapshot {
    pub fn new(config: ProxyConfig) -> Self {
        let gate = Gate::from_config(&config);
        // Checked by validation on load.
        let user_agent = HeaderValue::from_str(&config.upstream.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(concat!("github-proxy/", env!("CARGO_PKG_VERSION"))));
        Self { config, gate, user_agent }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub snapshot: Arc<ArcSwap<Snapshot>>,
    pub transport: Arc<dyn Transport>,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    snapshot: Arc<ArcSwap<Snapshot>>,
}

impl HttpServer {
    /// Create a server forwarding through the production transport.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a server forwarding through the given transport.
    pub fn with_transport(config: ProxyConfig, transport: Arc<dyn Transport>) -> Self {
        let snapshot = Arc::new(ArcSwap::from_pointee(Snapshot::new(config.clone())));
        let state = AppState {
            snapshot: snapshot.clone(),
            transport,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            snapshot,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(root_handler))
            .route("/ping", any(admin::handlers::ping))
            .route("/debug", any(admin::handlers::get_debug))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(RequestBodyLimitLayer::new(config.limits.max_request_body_bytes)),
            )
    }

    /// The router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, applying configuration
    /// updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            redirect = ?self.config.upstream.redirect,
            location_style = ?self.config.upstream.location_style,
            "HTTP server starting"
        );

        let reloader = tokio::spawn(apply_updates(
            self.snapshot.clone(),
            self.config.clone(),
            config_updates,
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the startup config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The currently active configuration generation.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }
}

/// Swap reloaded configs into the shared snapshot.
///
/// Transport settings (redirect mode, timeouts) and router layers are fixed
/// at startup; reloads keep the running values for them.
async fn apply_updates(
    snapshot: Arc<ArcSwap<Snapshot>>,
    startup: ProxyConfig,
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
) {
    while let Some(mut config) = updates.recv().await {
        if config.upstream.redirect != startup.upstream.redirect
            || config.timeouts != startup.timeouts
            || config.limits != startup.limits
        {
            tracing::warn!("Redirect mode, timeouts and limits require a restart; keeping running values");
            config.upstream.redirect = startup.upstream.redirect;
            config.timeouts = startup.timeouts.clone();
            config.limits = startup.limits.clone();
        }

        let next = Snapshot::new(config);
        tracing::info!(
            whitelist_entries = next.gate.whitelist().len(),
            allowed_hosts = next.gate.hosts().names().len(),
            "Configuration reloaded"
        );
        snapshot.store(Arc::new(next));
    }
}

/// `/` serves usage text unless a `url` query parameter names a destination.
async fn root_handler(state: State<AppState>, request: Request<Body>) -> Response {
    let has_destination = request.uri().query().is_some_and(|q| {
        url::form_urlencoded::parse(q.as_bytes()).any(|(key, _)| key == "url")
    });
    if has_destination {
        return proxy_handler(state, request).await;
    }

    let snapshot = state.snapshot.load();
    let origin = proxy_origin(request.headers(), snapshot.config.listener.public_origin.as_deref());
    admin::handlers::usage(&origin, snapshot.config.upstream.location_style)
}

/// Main proxy handler.
/// Admits the destination, forwards the request and rewrites the response.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let snapshot = state.snapshot.load_full();
    let request_id = request_id(request.headers()).to_string();
    let (parts, body) = request.into_parts();

    let target = InboundTarget::new(parts.uri.path(), parts.uri.query());
    let destination = match snapshot.gate.admit(&target) {
        Ok(destination) => destination,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                method = %parts.method,
                input = %target.raw(),
                reason = e.reason(),
                error = %e,
                "Request rejected"
            );
            metrics::record_rejection(e.reason());
            return e.into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        destination = %destination.url,
        key = ?destination.key.as_ref().map(ToString::to_string),
        "Forwarding request"
    );

    let upstream = upstream_request(&parts, body, &destination, &snapshot.user_agent);
    let sent_headers = upstream.headers.clone();
    let method = parts.method.to_string();

    let response = match send_upstream(&state, upstream, snapshot.config.timeouts.request_secs).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                destination = %destination.url,
                error = %e,
                "Upstream error"
            );
            metrics::record_request(&method, 500, destination.host(), start_time);
            metrics::record_rejection(e.reason());
            return e.into_response();
        }
    };

    let status = response.status;
    metrics::record_request(&method, status.as_u16(), destination.host(), start_time);

    if status == axum::http::StatusCode::NOT_FOUND && snapshot.config.upstream.diagnose_not_found {
        tracing::info!(request_id = %request_id, destination = %destination.url, "Upstream 404");
        return not_found(&destination, &sent_headers).into_response();
    }

    let origin = proxy_origin(&parts.headers, snapshot.config.listener.public_origin.as_deref());
    let ctx = RewriteContext {
        origin: &origin,
        style: snapshot.config.upstream.location_style,
        redirect: snapshot.config.upstream.redirect,
        destination: &destination.url,
    };
    finalize(response, &ctx)
}

/// One upstream round trip, bounded by the time-to-headers deadline.
///
/// The body keeps streaming after the deadline; only the wait for the status
/// line and headers is limited.
async fn send_upstream(
    state: &AppState,
    request: UpstreamRequest,
    request_secs: u64,
) -> crate::error::Result<UpstreamResponse> {
    match tokio::time::timeout(Duration::from_secs(request_secs), state.transport.send(request)).await {
        Ok(result) => result,
        Err(_) => Err(ProxyError::UpstreamTransport(format!(
            "no response from upstream within {}s",
            request_secs
        ))),
    }
}

fn not_found(destination: &Destination, sent: &axum::http::HeaderMap) -> ProxyError {
    let request_headers_sent: BTreeMap<String, String> = sent
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    ProxyError::UpstreamNotFound(Box::new(NotFoundDiagnostic {
        message: NOT_FOUND_MESSAGE.to_string(),
        target_url: destination.url.to_string(),
        upstream: UpstreamStatus {
            status: 404,
            status_text: "Not Found".to_string(),
        },
        request_headers_sent,
    }))
}
